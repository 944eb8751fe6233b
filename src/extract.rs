use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{PipelineError, Result};
use crate::info;

/// Extraction root for an archive: its path with the two-part `.tar.gz`
/// suffix removed.
pub fn extraction_root(archive_path: &Path) -> PathBuf {
    archive_path.with_extension("").with_extension("")
}

/// Extract `archive_path` next to itself if its root directory is missing,
/// then return the class folders inside the root, sorted by name.
///
/// The sort order fixes the label index of each class and must not change
/// between runs. Fails with [`PipelineError::Structure`] when the number of
/// folders differs from `num_classes`.
pub fn ensure(archive_path: &Path, num_classes: usize, force: bool) -> Result<Vec<PathBuf>> {
    let root = extraction_root(archive_path);
    if root.is_dir() && !force {
        info!(
            "{} already present - skipping extraction of {}",
            root.display(),
            archive_path.display()
        );
    } else {
        info!(
            "extracting data for {}. This may take a while",
            root.display()
        );
        let file = File::open(archive_path)?;
        let tar = GzDecoder::new(BufReader::new(file));
        let mut archive = Archive::new(tar);
        let dest = archive_path.parent().unwrap_or_else(|| Path::new("."));
        archive.unpack(dest)?;
    }

    let mut folders: Vec<PathBuf> = fs::read_dir(&root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();
    if folders.len() != num_classes {
        return Err(PipelineError::Structure {
            root,
            expected: num_classes,
            actual: folders.len(),
        });
    }
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    /// Build a `<name>.tar.gz` under `dir` containing one empty file per
    /// class folder.
    fn make_archive(dir: &Path, name: &str, classes: &[&str]) -> PathBuf {
        let archive_path = dir.join(format!("{name}.tar.gz"));
        let file = File::create(&archive_path).unwrap();
        let gz = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(gz);
        for class in classes {
            let content = b"x";
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(
                    &mut header,
                    format!("{name}/{class}/seed.png"),
                    &content[..],
                )
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        archive_path
    }

    #[test]
    fn strips_double_suffix() {
        let root = extraction_root(Path::new("/tmp/notMNIST_large.tar.gz"));
        assert_eq!(root, Path::new("/tmp/notMNIST_large"));
    }

    #[test]
    fn extracts_and_orders_class_folders() {
        let dir = tempfile::tempdir().unwrap();
        let archive = make_archive(dir.path(), "set", &["C", "A", "B"]);
        let folders = ensure(&archive, 3, false).unwrap();
        let names: Vec<_> = folders
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn wrong_folder_count_is_a_structure_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = make_archive(dir.path(), "set", &["A", "B"]);
        let err = ensure(&archive, 3, false).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Structure {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn present_root_skips_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let archive = make_archive(dir.path(), "set", &["A", "B", "C"]);
        ensure(&archive, 3, false).unwrap();
        // Removing a folder is only noticed because the second run skips
        // re-extraction and enumerates the stale tree.
        fs::remove_dir_all(dir.path().join("set").join("B")).unwrap();
        let err = ensure(&archive, 3, false).unwrap_err();
        assert!(matches!(err, PipelineError::Structure { actual: 2, .. }));
        // Forcing re-extracts and restores the tree.
        let folders = ensure(&archive, 3, true).unwrap();
        assert_eq!(folders.len(), 3);
    }
}
