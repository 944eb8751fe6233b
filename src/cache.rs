use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};
use crate::loader::ClassLoader;
use crate::{error, info};

/// Bumped whenever the blob layout changes; older blobs are recomputed.
const BLOB_VERSION: u32 = 1;

/// Suffix appended to a class folder's path to form its blob path.
const BLOB_SUFFIX: &str = ".bin";

#[derive(Serialize, Deserialize)]
struct BlobHeader {
    version: u32,
    fingerprint: String,
}

/// Blob path for a class folder: the folder path with `.bin` appended.
pub fn blob_path(class_dir: &Path) -> PathBuf {
    let mut os = class_dir.as_os_str().to_os_string();
    os.push(BLOB_SUFFIX);
    PathBuf::from(os)
}

/// SHA-256 over the sorted file names and sizes of a class folder.
///
/// A blob whose stored fingerprint differs from the folder's current one is
/// stale and gets recomputed instead of trusted by presence alone.
pub fn fingerprint(class_dir: &Path) -> Result<String> {
    let mut entries: Vec<(String, u64)> = Vec::new();
    for entry in fs::read_dir(class_dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.metadata()?.len()));
    }
    entries.sort();
    let mut hasher = Sha256::new();
    for (name, len) in &entries {
        hasher.update(name.as_bytes());
        hasher.update(len.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check whether the blob at `path` is usable for a folder with the given
/// fingerprint. Any read or decode failure just means "not usable".
pub fn is_valid(path: &Path, fingerprint: &str) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    match bincode::deserialize_from::<_, BlobHeader>(&mut reader) {
        Ok(header) => header.version == BLOB_VERSION && header.fingerprint == fingerprint,
        Err(_) => false,
    }
}

/// Serialize a class array to `path` behind its versioned header.
pub fn write(path: &Path, fingerprint: String, images: &Array3<f32>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(
        &mut writer,
        &BlobHeader {
            version: BLOB_VERSION,
            fingerprint,
        },
    )?;
    bincode::serialize_into(&mut writer, images)?;
    writer.flush()?;
    Ok(())
}

/// Read a class array back. All failures surface as [`PipelineError::Merge`]
/// since an unreadable class makes the whole split unusable.
pub fn read(path: &Path) -> Result<Array3<f32>> {
    let merge_err = |message: String| PipelineError::Merge {
        path: path.to_path_buf(),
        message,
    };
    let file = File::open(path).map_err(|e| merge_err(e.to_string()))?;
    let mut reader = BufReader::new(file);
    let header: BlobHeader =
        bincode::deserialize_from(&mut reader).map_err(|e| merge_err(e.to_string()))?;
    if header.version != BLOB_VERSION {
        return Err(merge_err(format!(
            "blob version {} does not match {}",
            header.version, BLOB_VERSION
        )));
    }
    bincode::deserialize_from(&mut reader).map_err(|e| merge_err(e.to_string()))
}

/// Make sure one class folder has a usable blob, loading and serializing it
/// when missing, stale or forced. Returns the blob path.
pub fn get_or_compute(
    loader: &ClassLoader,
    class_dir: &Path,
    min_images: usize,
    force: bool,
) -> Result<PathBuf> {
    let path = blob_path(class_dir);
    let fingerprint = fingerprint(class_dir)?;
    if !force && is_valid(&path, &fingerprint) {
        info!("{} already present - skipping", path.display());
        return Ok(path);
    }
    info!("caching {}", path.display());
    let images = loader.load(class_dir, min_images)?;
    write(&path, fingerprint, &images)?;
    Ok(path)
}

/// Cache every class folder, in label order.
///
/// Loader failures abort immediately (a class below its floor is systemic),
/// but a failed blob *write* only logs and moves on so that the remaining
/// classes are still attempted; the collected write failures are returned
/// as one error at the end rather than left as a latent gap.
pub fn cache_all(
    loader: &ClassLoader,
    class_dirs: &[PathBuf],
    min_images: usize,
    force: bool,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(class_dirs.len());
    let mut failed: Vec<PathBuf> = Vec::new();
    for class_dir in class_dirs {
        let path = blob_path(class_dir);
        let fingerprint = fingerprint(class_dir)?;
        if !force && is_valid(&path, &fingerprint) {
            info!("{} already present - skipping", path.display());
            paths.push(path);
            continue;
        }
        info!("caching {}", path.display());
        let images = loader.load(class_dir, min_images)?;
        if let Err(e) = write(&path, fingerprint, &images) {
            error!("unable to save data to {}: {}", path.display(), e);
            failed.push(path);
            continue;
        }
        paths.push(path);
    }
    if !failed.is_empty() {
        return Err(PipelineError::CacheWrite { failed });
    }
    Ok(paths)
}
