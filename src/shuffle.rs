use ndarray::{Array1, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::Split;
use crate::error::{PipelineError, Result};

/// Apply one random permutation to images and labels in lockstep.
///
/// Merging leaves each split as contiguous per-class blocks; this destroys
/// that ordering. The same permutation is used for both arrays, so row
/// `i` of the result still pairs the image with its label.
pub fn shuffle(
    images: Array3<f32>,
    labels: Array1<u8>,
    rng: &mut StdRng,
) -> Result<(Array3<f32>, Array1<u8>)> {
    let rows = images.shape()[0];
    if rows != labels.len() {
        return Err(PipelineError::ShapeMismatch {
            images: rows,
            labels: labels.len(),
        });
    }
    let mut permutation: Vec<usize> = (0..rows).collect();
    permutation.shuffle(rng);
    let shuffled_images = images.select(Axis(0), &permutation);
    let shuffled_labels = labels.select(Axis(0), &permutation);
    Ok((shuffled_images, shuffled_labels))
}

/// [`shuffle`] lifted to a whole [`Split`].
pub fn shuffle_split(split: Split, rng: &mut StdRng) -> Result<Split> {
    let (images, labels) = shuffle(split.images, split.labels, rng)?;
    Ok(Split { images, labels })
}
