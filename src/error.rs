use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the ingestion and partitioning pipeline.
///
/// Per-image decode defects are not represented here: the loader absorbs
/// them and only reports `InsufficientData` (or `ExcessiveDefects` when the
/// skip-ratio policy is enabled) once a whole class falls below its floor.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Downloaded archive does not have the expected byte size.
    #[error("failed to verify {path:?}: expected {expected} bytes, found {actual}. Can you get to it with a browser?")]
    Integrity {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Extracted tree does not contain one folder per class.
    #[error("expected {expected} folders, one per class, under {root:?}; found {actual} instead")]
    Structure {
        root: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Too few images in a class survived decoding.
    #[error("many fewer images than expected in {class_dir:?}: {loaded} < {min}")]
    InsufficientData {
        class_dir: PathBuf,
        loaded: usize,
        min: usize,
    },

    /// Skip-ratio policy tripped: too large a share of a class was defective.
    #[error("{skipped} of {total} images in {class_dir:?} were unreadable, above the configured ratio {max_ratio}")]
    ExcessiveDefects {
        class_dir: PathBuf,
        skipped: usize,
        total: usize,
        max_ratio: f64,
    },

    /// One or more class blobs could not be written. Every class was still
    /// attempted before this is returned.
    #[error("unable to save class data to {failed:?}")]
    CacheWrite { failed: Vec<PathBuf> },

    /// A class blob was unreadable or inconsistent while merging splits.
    #[error("unable to process data from {path:?}: {message}")]
    Merge { path: PathBuf, message: String },

    /// Image and label arrays disagree on their row counts.
    #[error("dataset has {images} rows but labels has {labels}")]
    ShapeMismatch { images: usize, labels: usize },

    /// Transport-level download failure.
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] bincode::Error),
}
