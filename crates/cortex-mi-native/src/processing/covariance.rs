//! Per-class spatial covariance estimation
//!
//! For every class the epochs bearing that label are pooled channel-major
//! (epoch and sample axes merged, channel axis kept) and the unbiased sample
//! covariance of the pooled channels × observations matrix is computed.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView3, Axis};

use cortex_mi_core::{ClassLabel, ValidationError};

/// Class label → channels × channels covariance, ordered by ascending label.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassCovariances {
    matrices: BTreeMap<ClassLabel, Array2<f64>>,
}

impl ClassCovariances {
    /// Distinct classes in ascending order
    pub fn classes(&self) -> impl Iterator<Item = ClassLabel> + '_ {
        self.matrices.keys().copied()
    }

    /// Covariance of one class
    #[must_use]
    pub fn get(&self, class: ClassLabel) -> Option<&Array2<f64>> {
        self.matrices.get(&class)
    }

    /// The two lowest classes and their matrices, the pair a binary contrast uses.
    #[must_use]
    pub fn contrast_pair(&self) -> Option<((ClassLabel, &Array2<f64>), (ClassLabel, &Array2<f64>))> {
        let mut iter = self.matrices.iter();
        let (a, cov_a) = iter.next()?;
        let (b, cov_b) = iter.next()?;
        Some(((*a, cov_a), (*b, cov_b)))
    }

    /// Number of classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// Whether no class is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Iterate over (class, matrix) pairs in ascending class order
    pub fn iter(&self) -> impl Iterator<Item = (ClassLabel, &Array2<f64>)> {
        self.matrices.iter().map(|(class, cov)| (*class, cov))
    }
}

/// Check an epoch set / label vector pair and return its sorted distinct classes.
///
/// Requires non-empty axes, one label per epoch and at least two classes.
pub fn validate_epochs(
    epochs: ArrayView3<'_, f64>,
    labels: &[ClassLabel],
) -> Result<Vec<ClassLabel>, ValidationError> {
    let (n_epochs, n_channels, n_samples) = epochs.dim();

    if n_epochs == 0 {
        return Err(ValidationError::EmptyAxis { axis: "epochs" });
    }
    if n_channels == 0 {
        return Err(ValidationError::EmptyAxis { axis: "channels" });
    }
    if n_samples == 0 {
        return Err(ValidationError::EmptyAxis { axis: "samples" });
    }
    if labels.len() != n_epochs {
        return Err(ValidationError::LengthMismatch {
            epochs: n_epochs,
            labels: labels.len(),
        });
    }

    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();

    if classes.len() < 2 {
        return Err(ValidationError::InsufficientClasses {
            found: classes.len(),
            required: 2,
        });
    }

    Ok(classes)
}

/// Estimate one spatial covariance matrix per class.
///
/// # Errors
///
/// Returns a [`ValidationError`] for empty axes, a label count that differs
/// from the epoch count, or fewer than two distinct labels.
pub fn estimate_covariances(
    epochs: ArrayView3<'_, f64>,
    labels: &[ClassLabel],
) -> Result<ClassCovariances, ValidationError> {
    let classes = validate_epochs(epochs, labels)?;

    let matrices = classes
        .into_iter()
        .map(|class| {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|&(_, &label)| label == class)
                .map(|(index, _)| index)
                .collect();
            (class, pooled_covariance(epochs, &members))
        })
        .collect();

    Ok(ClassCovariances { matrices })
}

/// Sample covariance of the selected epochs pooled along time.
fn pooled_covariance(epochs: ArrayView3<'_, f64>, members: &[usize]) -> Array2<f64> {
    let (_, n_channels, n_samples) = epochs.dim();
    let n_obs = members.len() * n_samples;

    // channels × (epochs · samples), epoch blocks side by side
    let mut pooled = Array2::<f64>::zeros((n_channels, n_obs));
    for (block, &index) in members.iter().enumerate() {
        let start = block * n_samples;
        pooled
            .slice_mut(ndarray::s![.., start..start + n_samples])
            .assign(&epochs.index_axis(Axis(0), index));
    }

    if let Some(mean) = pooled.mean_axis(Axis(1)) {
        pooled -= &mean.insert_axis(Axis(1));
    }

    let ddof = if n_obs > 1 { (n_obs - 1) as f64 } else { 1.0 };
    let mut cov = pooled.dot(&pooled.t()) / ddof;

    // Exact symmetry for the downstream symmetric solver
    for i in 0..n_channels {
        for j in (i + 1)..n_channels {
            let avg = 0.5 * (cov[[i, j]] + cov[[j, i]]);
            cov[[i, j]] = avg;
            cov[[j, i]] = avg;
        }
    }

    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp_epochs(n_epochs: usize, n_channels: usize, n_samples: usize) -> Array3<f64> {
        Array3::from_shape_fn((n_epochs, n_channels, n_samples), |(e, c, s)| {
            ((e * 31 + c * 7 + s * 13) % 17) as f64 - 8.0 + (c as f64) * (s as f64).sin()
        })
    }

    #[test]
    fn test_two_classes_four_channels() {
        let epochs = ramp_epochs(10, 4, 100);
        let labels: Vec<ClassLabel> = [0; 5].into_iter().chain([1; 5]).collect();

        let covs = estimate_covariances(epochs.view(), &labels).unwrap();
        assert_eq!(covs.len(), 2);
        assert_eq!(covs.classes().collect::<Vec<_>>(), vec![0, 1]);

        for (_, cov) in covs.iter() {
            assert_eq!(cov.dim(), (4, 4));
            for i in 0..4 {
                assert!(cov[[i, i]] >= 0.0);
                for j in 0..4 {
                    assert_eq!(cov[[i, j]], cov[[j, i]]);
                }
            }
        }
    }

    #[test]
    fn test_matches_manual_variance() {
        // One channel; class 5 holds samples [1, 2] and [3, 4] → var of 1..=4 is 5/3
        let epochs = Array3::from_shape_vec((3, 1, 2), vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0]).unwrap();
        let covs = estimate_covariances(epochs.view(), &[5, 5, 9]).unwrap();

        let cov = covs.get(5).unwrap();
        assert!((cov[[0, 0]] - 5.0 / 3.0).abs() < 1e-12);
        assert!(covs.get(9).unwrap()[[0, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_classes_sorted_regardless_of_order() {
        let epochs = ramp_epochs(6, 3, 20);
        let labels = [2, 1, 2, 1, 2, 1];
        let covs = estimate_covariances(epochs.view(), &labels).unwrap();

        let ((a, _), (b, _)) = covs.contrast_pair().unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn test_single_class_rejected() {
        let epochs = ramp_epochs(4, 3, 20);
        let err = estimate_covariances(epochs.view(), &[1, 1, 1, 1]).unwrap_err();
        assert_eq!(err, ValidationError::InsufficientClasses { found: 1, required: 2 });
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let epochs = ramp_epochs(4, 3, 20);
        let err = estimate_covariances(epochs.view(), &[1, 2, 1]).unwrap_err();
        assert_eq!(err, ValidationError::LengthMismatch { epochs: 4, labels: 3 });
    }

    #[test]
    fn test_empty_axis_rejected() {
        let epochs = Array3::<f64>::zeros((2, 0, 10));
        let err = estimate_covariances(epochs.view(), &[1, 2]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyAxis { axis: "channels" });
    }

    #[test]
    fn test_one_epoch_per_class() {
        let epochs = ramp_epochs(2, 3, 50);
        let covs = estimate_covariances(epochs.view(), &[0, 1]).unwrap();
        assert_eq!(covs.len(), 2);
    }
}
