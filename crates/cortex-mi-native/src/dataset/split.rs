//! Seeded train/test split
//!
//! Epoch indices are shuffled with a ChaCha8 generator seeded from the
//! configuration, so the same seed always holds out the same epochs.

use ndarray::{Array3, ArrayView3, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use cortex_mi_core::{ClassLabel, ValidationError};

/// Epochs and their labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledEpochs {
    /// Epochs × channels × samples
    pub x: Array3<f64>,
    /// One label per epoch
    pub y: Vec<ClassLabel>,
}

impl LabeledEpochs {
    /// Pair epochs with labels.
    ///
    /// # Errors
    ///
    /// [`ValidationError::LengthMismatch`] when counts differ.
    pub fn new(x: Array3<f64>, y: Vec<ClassLabel>) -> Result<Self, ValidationError> {
        if x.len_of(Axis(0)) != y.len() {
            return Err(ValidationError::LengthMismatch {
                epochs: x.len_of(Axis(0)),
                labels: y.len(),
            });
        }
        Ok(Self { x, y })
    }

    /// Number of epochs
    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether there are no epochs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Borrow the epochs
    #[must_use]
    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.x.view()
    }
}

/// Training and held-out test partitions.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSplit {
    /// Used for cross-validation and fitting
    pub train: LabeledEpochs,
    /// Held out for final scoring and prediction
    pub test: LabeledEpochs,
}

/// Shuffle and partition epochs; the test part gets `ceil(test_fraction · n)` epochs.
///
/// # Errors
///
/// [`ValidationError`] when counts differ, the fraction is outside (0, 1) or
/// either partition would be empty.
pub fn train_test_split(
    x: ArrayView3<'_, f64>,
    y: &[ClassLabel],
    test_fraction: f64,
    seed: u64,
) -> Result<DatasetSplit, ValidationError> {
    let n = x.len_of(Axis(0));
    if y.len() != n {
        return Err(ValidationError::LengthMismatch { epochs: n, labels: y.len() });
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ValidationError::out_of_range(
            "test_fraction",
            "strictly between 0 and 1",
            test_fraction,
        ));
    }

    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ValidationError::out_of_range(
            "epoch count",
            format!("enough for a {test_fraction} split into two non-empty parts"),
            n,
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let part = |idx: &[usize]| LabeledEpochs {
        x: x.select(Axis(0), idx),
        y: idx.iter().map(|&i| y[i]).collect(),
    };

    Ok(DatasetSplit {
        train: part(train_idx),
        test: part(test_idx),
    })
}
