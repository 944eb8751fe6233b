use std::path::PathBuf;

use ndarray::{s, Array1, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::cache;
use crate::dataset::Split;
use crate::error::{PipelineError, Result};

/// Requested and realized row counts for one split. The realized count is
/// the requested one floored to a multiple of the class count; the caller
/// sees the truncation instead of silently receiving fewer rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub requested: usize,
    pub realized: usize,
    pub per_class: usize,
}

impl SplitSizes {
    fn for_classes(requested: usize, num_classes: usize) -> Self {
        let per_class = requested / num_classes;
        Self {
            requested,
            realized: per_class * num_classes,
            per_class,
        }
    }
}

/// Result of merging per-class blobs into labeled splits.
#[derive(Debug)]
pub struct MergeOutput {
    pub train: Split,
    pub valid: Split,
    pub train_sizes: SplitSizes,
    pub valid_sizes: SplitSizes,
}

/// Draw balanced validation and training splits from per-class blobs.
///
/// `blob_paths` must be in label order: the position of a blob is its class
/// index. Each class array is shuffled with `rng`, then its first
/// `valid_sizes.per_class` rows go to validation and the next
/// `train_sizes.per_class` rows to training, as contiguous per-class blocks.
/// Any unreadable or undersized blob aborts the merge.
pub fn merge(
    blob_paths: &[PathBuf],
    train_size: usize,
    valid_size: usize,
    image_size: usize,
    rng: &mut StdRng,
) -> Result<MergeOutput> {
    let num_classes = blob_paths.len();
    let train_sizes = SplitSizes::for_classes(train_size, num_classes);
    let valid_sizes = SplitSizes::for_classes(valid_size, num_classes);

    let mut train_images = Array3::<f32>::zeros((train_sizes.realized, image_size, image_size));
    let mut train_labels = Array1::<u8>::zeros(train_sizes.realized);
    let mut valid_images = Array3::<f32>::zeros((valid_sizes.realized, image_size, image_size));
    let mut valid_labels = Array1::<u8>::zeros(valid_sizes.realized);

    for (label, path) in blob_paths.iter().enumerate() {
        let letter_set = cache::read(path)?;
        let (rows, height, width) = letter_set.dim();
        if height != image_size || width != image_size {
            return Err(PipelineError::Merge {
                path: path.clone(),
                message: format!("blob images are {height}x{width}, expected {image_size}x{image_size}"),
            });
        }
        let needed = valid_sizes.per_class + train_sizes.per_class;
        if rows < needed {
            return Err(PipelineError::Merge {
                path: path.clone(),
                message: format!("class holds {rows} images, split draws {needed}"),
            });
        }

        // Per-class shuffle, so the validation and training draws are
        // random rather than the first rows on disk.
        let mut order: Vec<usize> = (0..rows).collect();
        order.shuffle(rng);

        let valid_base = label * valid_sizes.per_class;
        for i in 0..valid_sizes.per_class {
            valid_images
                .slice_mut(s![valid_base + i, .., ..])
                .assign(&letter_set.slice(s![order[i], .., ..]));
            valid_labels[valid_base + i] = label as u8;
        }
        let train_base = label * train_sizes.per_class;
        for i in 0..train_sizes.per_class {
            train_images
                .slice_mut(s![train_base + i, .., ..])
                .assign(&letter_set.slice(s![order[valid_sizes.per_class + i], .., ..]));
            train_labels[train_base + i] = label as u8;
        }
    }

    Ok(MergeOutput {
        train: Split {
            images: train_images,
            labels: train_labels,
        },
        valid: Split {
            images: valid_images,
            labels: valid_labels,
        },
        train_sizes,
        valid_sizes,
    })
}
