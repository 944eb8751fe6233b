use std::time::Duration;

use crate::cache;
use crate::config::PipelineConfig;
use crate::dataset::NotMnist;
use crate::error::Result;
use crate::extract;
use crate::fetch::{self, Fetcher, HttpFetcher};
use crate::info;
use crate::loader::ClassLoader;
use crate::merge;
use crate::rng;
use crate::shuffle;

/// Run the whole pipeline with the default HTTP downloader.
pub fn prepare(cfg: &PipelineConfig, force: bool) -> Result<NotMnist> {
    let fetcher = HttpFetcher::new(Duration::from_secs(cfg.download_timeout_secs));
    prepare_with(cfg, &fetcher, force)
}

/// Run the whole pipeline: acquire and extract both archives, cache every
/// class, merge the large archive into train + validation and the small one
/// into test, then shuffle each split globally.
///
/// All randomness (per-class draws and global shuffles) comes from one
/// generator seeded from the config, so identical inputs yield identical
/// splits. Acquisition, extraction and caching all skip work already done
/// unless `force` is set.
pub fn prepare_with(cfg: &PipelineConfig, fetcher: &dyn Fetcher, force: bool) -> Result<NotMnist> {
    let mut rng = rng::seeded(cfg.seed);
    let loader = ClassLoader::from_config(cfg);

    let train_archive = fetch::ensure(
        fetcher,
        &cfg.base_url,
        &cfg.train_archive.filename,
        &cfg.data_root,
        cfg.train_archive.expected_bytes,
        force,
    )?;
    let test_archive = fetch::ensure(
        fetcher,
        &cfg.base_url,
        &cfg.test_archive.filename,
        &cfg.data_root,
        cfg.test_archive.expected_bytes,
        force,
    )?;

    let train_folders = extract::ensure(&train_archive, cfg.num_classes, force)?;
    let test_folders = extract::ensure(&test_archive, cfg.num_classes, force)?;

    let train_blobs = cache::cache_all(
        &loader,
        &train_folders,
        cfg.train_archive.min_images_per_class,
        force,
    )?;
    let test_blobs = cache::cache_all(
        &loader,
        &test_folders,
        cfg.test_archive.min_images_per_class,
        force,
    )?;

    let merged = merge::merge(
        &train_blobs,
        cfg.train_size,
        cfg.valid_size,
        cfg.image_size,
        &mut rng,
    )?;
    let test_merged = merge::merge(&test_blobs, cfg.test_size, 0, cfg.image_size, &mut rng)?;

    info!(
        "merged splits: train {} of {} requested, valid {} of {}, test {} of {}",
        merged.train_sizes.realized,
        merged.train_sizes.requested,
        merged.valid_sizes.realized,
        merged.valid_sizes.requested,
        test_merged.train_sizes.realized,
        test_merged.train_sizes.requested,
    );

    // Same shuffle order as the assignment: train, test, then validation.
    let train = shuffle::shuffle_split(merged.train, &mut rng)?;
    let test = shuffle::shuffle_split(test_merged.train, &mut rng)?;
    let valid = shuffle::shuffle_split(merged.valid, &mut rng)?;

    info!("training: {:?} {:?}", train.images.dim(), train.labels.dim());
    info!("validation: {:?} {:?}", valid.images.dim(), valid.labels.dim());
    info!("testing: {:?} {:?}", test.images.dim(), test.labels.dim());

    Ok(NotMnist { train, valid, test })
}
