//! K-fold cross-validation
//!
//! Folds are contiguous and unshuffled: with `n` samples and `k` folds the
//! first `n % k` folds hold `n / k + 1` samples and the rest `n / k`. Every
//! sample is tested exactly once.

use ndarray::{ArrayView3, Axis};
use tracing::debug;

use cortex_mi_core::{ClassLabel, ValidationError};

use crate::error::ModelResult;
use crate::ml::{Classifier, Pipeline};

/// One train/test partition of sample indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fold {
    /// Indices used for fitting
    pub train: Vec<usize>,
    /// Indices used for scoring
    pub test: Vec<usize>,
}

/// Contiguous k-fold splitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    /// Create a splitter with `n_splits ≥ 2` folds.
    pub fn new(n_splits: usize) -> Result<Self, ValidationError> {
        if n_splits < 2 {
            return Err(ValidationError::out_of_range("n_splits", "at least 2", n_splits));
        }
        Ok(Self { n_splits })
    }

    /// Number of folds
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Partition `0..n_samples` into folds.
    ///
    /// # Errors
    ///
    /// [`ValidationError::OutOfRange`] when there are fewer samples than folds.
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>, ValidationError> {
        if n_samples < self.n_splits {
            return Err(ValidationError::out_of_range(
                "n_samples",
                format!("at least n_splits = {}", self.n_splits),
                n_samples,
            ));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let stop = start + size;
            folds.push(Fold {
                train: (0..start).chain(stop..n_samples).collect(),
                test: (start..stop).collect(),
            });
            start = stop;
        }

        Ok(folds)
    }
}

/// Accuracy of a fresh clone of `template` on every fold.
///
/// `template` itself is never fitted.
///
/// # Errors
///
/// Fold construction errors, and the first fit/score failure.
pub fn cross_val_score<C>(
    template: &Pipeline<C>,
    epochs: ArrayView3<'_, f64>,
    labels: &[ClassLabel],
    kfold: &KFold,
) -> ModelResult<Vec<f64>>
where
    C: Classifier + Clone,
{
    let n_epochs = epochs.len_of(Axis(0));
    if labels.len() != n_epochs {
        return Err(ValidationError::LengthMismatch {
            epochs: n_epochs,
            labels: labels.len(),
        }
        .into());
    }

    let mut scores = Vec::with_capacity(kfold.n_splits());
    for (index, fold) in kfold.split(n_epochs)?.into_iter().enumerate() {
        let train_x = epochs.select(Axis(0), &fold.train);
        let train_y: Vec<ClassLabel> = fold.train.iter().map(|&i| labels[i]).collect();
        let test_x = epochs.select(Axis(0), &fold.test);
        let test_y: Vec<ClassLabel> = fold.test.iter().map(|&i| labels[i]).collect();

        let mut model = template.clone();
        model.fit(train_x.view(), &train_y)?;
        let score = model.score(test_x.view(), &test_y)?;

        debug!(fold = index, train = train_y.len(), test = test_y.len(), score, "Fold scored");
        scores.push(score);
    }

    Ok(scores)
}
