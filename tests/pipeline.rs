use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::write::GzEncoder;
use flate2::Compression;
use image::{GrayImage, Luma};
use tempfile::TempDir;

use notmnist::config::{ArchiveSpec, PipelineConfig};
use notmnist::error::Result;
use notmnist::fetch::Fetcher;
use notmnist::pipeline::prepare_with;

const CLASSES: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];

/// The pipeline must never reach for the network in these tests: both
/// archives are placed in the data root up front.
struct NoNetwork;

impl Fetcher for NoNetwork {
    fn fetch(&self, url: &str, _dest: &Path) -> Result<()> {
        panic!("unexpected download of {url}");
    }
}

/// Build `<root_name>.tar.gz` in `data_root` with one folder per class and
/// `per_class` 28x28 images each. Every pixel of an image carries
/// `class * 25 + (index % 25)`, making its class recoverable from pixels.
fn make_archive(data_root: &Path, root_name: &str, per_class: usize) -> u64 {
    let staging = data_root.join("staging").join(root_name);
    for (class, name) in CLASSES.iter().enumerate() {
        let class_dir = staging.join(name);
        fs::create_dir_all(&class_dir).unwrap();
        for i in 0..per_class {
            let value = (class * 25 + (i % 25)) as u8;
            let img = GrayImage::from_pixel(28, 28, Luma([value]));
            img.save(class_dir.join(format!("img_{i:04}.png"))).unwrap();
        }
    }
    let archive_path = data_root.join(format!("{root_name}.tar.gz"));
    let gz = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::fast());
    let mut builder = tar::Builder::new(gz);
    builder.append_dir_all(root_name, &staging).unwrap();
    builder.into_inner().unwrap().finish().unwrap();
    fs::remove_dir_all(data_root.join("staging")).unwrap();
    fs::metadata(&archive_path).unwrap().len()
}

fn test_config(data_root: &Path) -> PipelineConfig {
    let train_bytes = make_archive(data_root, "train_set", 30);
    let test_bytes = make_archive(data_root, "test_set", 12);
    PipelineConfig {
        base_url: "http://localhost/never/".to_string(),
        data_root: data_root.to_path_buf(),
        train_archive: ArchiveSpec {
            filename: "train_set.tar.gz".to_string(),
            expected_bytes: train_bytes,
            min_images_per_class: 25,
        },
        test_archive: ArchiveSpec {
            filename: "test_set.tar.gz".to_string(),
            expected_bytes: test_bytes,
            min_images_per_class: 10,
        },
        train_size: 200,
        valid_size: 50,
        test_size: 100,
        seed: 133,
        ..PipelineConfig::default()
    }
}

fn class_of_pixel(normalized: f32) -> u8 {
    let raw = (normalized * 255.0 + 127.5).round() as usize;
    (raw / 25) as u8
}

#[test]
fn end_to_end_prepare() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    let data = prepare_with(&cfg, &NoNetwork, false).unwrap();

    assert_eq!(data.train.images.dim(), (200, 28, 28));
    assert_eq!(data.valid.images.dim(), (50, 28, 28));
    assert_eq!(data.test.images.dim(), (100, 28, 28));
    assert_eq!(data.train.label_counts(10), vec![20; 10]);
    assert_eq!(data.valid.label_counts(10), vec![5; 10]);
    assert_eq!(data.test.label_counts(10), vec![10; 10]);

    // Labels survive the global shuffle attached to their image.
    for split in [&data.train, &data.valid, &data.test] {
        for row in 0..split.len() {
            assert_eq!(class_of_pixel(split.images[[row, 0, 0]]), split.labels[row]);
        }
    }

    // Post-shuffle each split should not be in contiguous class blocks.
    assert!(data
        .train
        .labels
        .iter()
        .zip(data.train.labels.iter().skip(1))
        .any(|(a, b)| a > b));

    // Boundary contract helpers for the training collaborator.
    assert_eq!(data.train.to_flat().dim(), (200, 784));
    assert_eq!(data.train.one_hot_labels(10).dim(), (200, 10));
}

#[test]
fn second_run_reuses_all_cached_work() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    let first = prepare_with(&cfg, &NoNetwork, false).unwrap();

    let blob_paths: Vec<PathBuf> = CLASSES
        .iter()
        .map(|c| dir.path().join("train_set").join(format!("{c}.bin")))
        .collect();
    let mtimes: Vec<SystemTime> = blob_paths
        .iter()
        .map(|p| fs::metadata(p).unwrap().modified().unwrap())
        .collect();

    let second = prepare_with(&cfg, &NoNetwork, false).unwrap();

    // No blob was rewritten on the second run.
    for (path, before) in blob_paths.iter().zip(&mtimes) {
        assert_eq!(&fs::metadata(path).unwrap().modified().unwrap(), before);
    }

    // With the same seed and inputs the splits are bit-identical.
    assert_eq!(first.train, second.train);
    assert_eq!(first.valid, second.valid);
    assert_eq!(first.test, second.test);
}

#[test]
fn force_rebuilds_the_blobs() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    prepare_with(&cfg, &NoNetwork, false).unwrap();
    let blob = dir.path().join("train_set").join("A.bin");
    let before = fs::metadata(&blob).unwrap().modified().unwrap();

    struct LocalCopy(PathBuf);
    impl Fetcher for LocalCopy {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            let name = url.rsplit('/').next().unwrap();
            fs::copy(self.0.join("archives").join(name), dest)?;
            Ok(())
        }
    }
    // Stash archive copies the forced "download" can serve.
    let stash = dir.path().join("archives");
    fs::create_dir_all(&stash).unwrap();
    for name in ["train_set.tar.gz", "test_set.tar.gz"] {
        fs::copy(dir.path().join(name), stash.join(name)).unwrap();
    }

    let data = prepare_with(&cfg, &LocalCopy(dir.path().to_path_buf()), true).unwrap();
    assert_eq!(data.train.label_counts(10), vec![20; 10]);
    assert!(fs::metadata(&blob).unwrap().modified().unwrap() > before);
}
