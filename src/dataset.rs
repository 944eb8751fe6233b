use ndarray::{Array1, Array2, Array3};

/// One partition of the dataset: normalized images and their labels, kept
/// in row correspondence.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// `(count, size, size)` array of normalized pixels.
    pub images: Array3<f32>,
    /// `(count,)` array of class indices.
    pub labels: Array1<u8>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count the rows carrying each label.
    pub fn label_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for &label in self.labels.iter() {
            if let Some(slot) = counts.get_mut(label as usize) {
                *slot += 1;
            }
        }
        counts
    }

    /// Flatten images to one `(count, size * size)` row vector per sample,
    /// the shape the fully-connected training variants consume.
    pub fn to_flat(&self) -> Array2<f32> {
        let (count, rows, cols) = self.images.dim();
        let flat: Vec<f32> = self.images.iter().copied().collect();
        Array2::from_shape_vec((count, rows * cols), flat)
            .expect("element count matches count * rows * cols")
    }

    /// One-hot encode labels into a `(count, num_classes)` float array.
    pub fn one_hot_labels(&self, num_classes: usize) -> Array2<f32> {
        let mut encoded = Array2::<f32>::zeros((self.labels.len(), num_classes));
        for (row, &label) in self.labels.iter().enumerate() {
            encoded[[row, label as usize]] = 1.0;
        }
        encoded
    }
}

/// The three partitions handed to the training collaborator.
#[derive(Debug, Clone)]
pub struct NotMnist {
    pub train: Split,
    pub valid: Split,
    pub test: Split,
}
