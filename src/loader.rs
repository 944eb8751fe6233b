use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2, Array3};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::{info, warn};

/// Why a single image was dropped. Dropping is expected at a low rate and
/// never fails the class on its own.
#[derive(Debug)]
enum DecodeDefect {
    Unreadable(image::ImageError),
    WrongShape { width: u32, height: u32 },
}

impl fmt::Display for DecodeDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeDefect::Unreadable(e) => write!(f, "{}", e),
            DecodeDefect::WrongShape { width, height } => {
                write!(f, "unexpected image shape: {}x{}", width, height)
            }
        }
    }
}

/// Loads one class folder into a normalized `(count, size, size)` array.
pub struct ClassLoader {
    image_size: usize,
    pixel_depth: f32,
    max_skip_ratio: Option<f64>,
}

impl ClassLoader {
    pub fn new(image_size: usize, pixel_depth: f32, max_skip_ratio: Option<f64>) -> Self {
        Self {
            image_size,
            pixel_depth,
            max_skip_ratio,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(cfg.image_size, cfg.pixel_depth, cfg.max_skip_ratio)
    }

    /// Load the data for a single class label.
    ///
    /// Every file in `class_dir` is decoded as a grayscale image and
    /// rescaled to roughly `[-0.5, 0.5]`. Unreadable or wrong-shaped files
    /// are skipped with a warning; the array is trimmed to the rows that
    /// loaded. Fewer than `min_images` survivors, or a skipped share above
    /// the configured ratio, indicate a systemic problem and abort.
    pub fn load(&self, class_dir: &Path, min_images: usize) -> Result<Array3<f32>> {
        let mut files: Vec<PathBuf> = fs::read_dir(class_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        // Directory enumeration order is platform-dependent; a fixed order
        // keeps the loaded array reproducible.
        files.sort();

        let mut dataset = Array3::<f32>::zeros((files.len(), self.image_size, self.image_size));
        let mut loaded = 0usize;
        for path in &files {
            match self.decode(path) {
                Ok(image) => {
                    dataset.slice_mut(s![loaded, .., ..]).assign(&image);
                    loaded += 1;
                }
                Err(defect) => {
                    warn!(
                        "could not read {}: {} - it's ok, skipping",
                        path.display(),
                        defect
                    );
                }
            }
        }
        let dataset = dataset.slice_move(s![..loaded, .., ..]);

        let skipped = files.len() - loaded;
        if let Some(max_ratio) = self.max_skip_ratio {
            if !files.is_empty() && skipped as f64 / files.len() as f64 > max_ratio {
                return Err(PipelineError::ExcessiveDefects {
                    class_dir: class_dir.to_path_buf(),
                    skipped,
                    total: files.len(),
                    max_ratio,
                });
            }
        }
        if loaded < min_images {
            return Err(PipelineError::InsufficientData {
                class_dir: class_dir.to_path_buf(),
                loaded,
                min: min_images,
            });
        }

        // Informational only, mirrors the sanity numbers printed per class.
        let mean = dataset.mean().unwrap_or(0.0);
        let std = dataset.std(0.0);
        info!(
            "{}: full dataset tensor {:?}, mean {:.4}, stddev {:.4}",
            class_dir.display(),
            dataset.dim(),
            mean,
            std
        );
        Ok(dataset)
    }

    fn decode(&self, path: &Path) -> std::result::Result<Array2<f32>, DecodeDefect> {
        let image = image::open(path).map_err(DecodeDefect::Unreadable)?;
        let gray = image.to_luma8();
        if gray.width() as usize != self.image_size || gray.height() as usize != self.image_size {
            return Err(DecodeDefect::WrongShape {
                width: gray.width(),
                height: gray.height(),
            });
        }
        let half = self.pixel_depth / 2.0;
        Ok(Array2::from_shape_fn(
            (self.image_size, self.image_size),
            |(row, col)| (gray.get_pixel(col as u32, row as u32)[0] as f32 - half) / self.pixel_depth,
        ))
    }
}
