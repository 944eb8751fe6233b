use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// One source archive: its filename under the base URL, the byte size used
/// to verify the download, and the per-class floor the loader enforces.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSpec {
    pub filename: String,
    pub expected_bytes: u64,
    pub min_images_per_class: usize,
}

/// Pipeline configuration loaded from a TOML or JSON file.
///
/// Defaults match the notMNIST course assignment: two archives hosted on
/// Google cloud storage, ten letter classes of 28x28 grayscale images, and
/// a 200k/10k/10k train/validation/test partition drawn with seed 133.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base URL the archive filenames are appended to.
    pub base_url: String,
    /// Local directory holding archives, extracted trees and class blobs.
    pub data_root: PathBuf,
    /// Large archive the train and validation splits are drawn from.
    pub train_archive: ArchiveSpec,
    /// Small archive the test split is drawn from.
    pub test_archive: ArchiveSpec,
    /// Number of class folders each archive must contain.
    pub num_classes: usize,
    /// Pixel width and height of every image.
    pub image_size: usize,
    /// Number of levels per pixel.
    pub pixel_depth: f32,
    pub train_size: usize,
    pub valid_size: usize,
    pub test_size: usize,
    /// Seed for the single RNG threaded through merge and shuffle.
    pub seed: u64,
    /// Timeout applied to each archive download.
    pub download_timeout_secs: u64,
    /// Upper bound on the defective share of a class, checked independently
    /// of `min_images_per_class`. `None` keeps the historical behaviour of
    /// tolerating any ratio that still clears the absolute floor.
    pub max_skip_ratio: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://commondatastorage.googleapis.com/books1000/".to_string(),
            data_root: PathBuf::from("data"),
            train_archive: ArchiveSpec {
                filename: "notMNIST_large.tar.gz".to_string(),
                expected_bytes: 247_336_696,
                min_images_per_class: 45_000,
            },
            test_archive: ArchiveSpec {
                filename: "notMNIST_small.tar.gz".to_string(),
                expected_bytes: 8_458_043,
                min_images_per_class: 1_800,
            },
            num_classes: 10,
            image_size: 28,
            pixel_depth: 255.0,
            train_size: 200_000,
            valid_size: 10_000,
            test_size: 10_000,
            seed: 133,
            download_timeout_secs: 600,
            max_skip_ratio: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the given path.  Supports TOML or JSON based
    /// on the file extension. Returns `None` if reading or parsing fails.
    pub fn from_path(path: &str) -> Option<Self> {
        let Ok(content) = fs::read_to_string(path) else {
            return None;
        };
        if path.ends_with(".json") {
            serde_json::from_str(&content).ok()
        } else {
            toml::from_str(&content).ok()
        }
    }
}
