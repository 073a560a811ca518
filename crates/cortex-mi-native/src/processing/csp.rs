//! Common Spatial Pattern (CSP) spatial filtering
//!
//! Learns a projection from channel space onto a few spatial components whose
//! variance differs most between two classes, and reduces each epoch to the
//! average power of every component.
//!
//! # Algorithm
//!
//! With `A` the covariance of the lower class and `B` that of the higher one,
//! the filters are the generalized eigenvectors of
//!
//! ```text
//! A v = λ (A + B) v
//! ```
//!
//! Every λ lies in [0, 1] and is the share of `v`'s variance owed to class A.
//! Components are ordered by |λ − 0.5| descending, so the most class-A
//! dominant and most class-B dominant directions come first, and truncated
//! to `n_components`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cortex_mi_native::processing::csp::CommonSpatialPattern;
//!
//! let mut csp = CommonSpatialPattern::new(SpatialFilterConfig::default());
//! csp.fit(train_epochs.view(), &train_labels)?;
//! let features = csp.transform(test_epochs.view())?; // (epochs, 4)
//! ```

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cortex_mi_core::{ClassLabel, SpatialFilterConfig, ValidationError};

use crate::error::{CspError, CspResult};
use crate::processing::covariance::estimate_covariances;

/// Spatial filter fitted on a two-class covariance contrast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommonSpatialPattern {
    config: SpatialFilterConfig,
    /// Sorted distinct labels seen at fit time
    classes: Vec<ClassLabel>,
    /// channels × components, columns ordered by discriminability
    filters: Option<Array2<f64>>,
    /// Generalized eigenvalue of each retained column
    eigenvalues: Option<Array1<f64>>,
}

impl CommonSpatialPattern {
    /// Create an unfitted filter.
    #[must_use]
    pub fn new(config: SpatialFilterConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            filters: None,
            eigenvalues: None,
        }
    }

    /// Create an unfitted filter keeping `n_components` components.
    #[must_use]
    pub fn with_components(n_components: Option<usize>) -> Self {
        Self::new(SpatialFilterConfig {
            n_components,
            ..SpatialFilterConfig::default()
        })
    }

    /// Learn the spatial filters from labeled epochs.
    ///
    /// # Errors
    ///
    /// - [`CspError::Validation`] for malformed epochs/labels or fewer than
    ///   two classes
    /// - [`CspError::IllConditioned`] when the pooled covariance of the two
    ///   contrasted classes is not positive definite
    pub fn fit(&mut self, epochs: ArrayView3<'_, f64>, labels: &[ClassLabel]) -> CspResult<&mut Self> {
        if self.config.n_components == Some(0) {
            return Err(ValidationError::out_of_range("n_components", "at least 1", 0).into());
        }

        let covariances = estimate_covariances(epochs, labels)?;
        let ((class_a, cov_a), (class_b, cov_b)) = covariances
            .contrast_pair()
            .ok_or(ValidationError::InsufficientClasses { found: covariances.len(), required: 2 })?;

        if covariances.len() > 2 {
            warn!(
                classes = covariances.len(),
                class_a, class_b, "CSP contrasts only the two lowest classes"
            );
        }

        let (eigenvalues, eigenvectors) = generalized_eigh(cov_a, cov_b, self.config.regularization)
            .ok_or(CspError::IllConditioned { class_a, class_b })?;

        let order = discriminative_order(&eigenvalues);
        let n_channels = cov_a.nrows();
        let keep = self.config.n_components.map_or(n_channels, |k| k.min(n_channels));

        let filters = Array2::from_shape_fn((n_channels, keep), |(row, col)| {
            eigenvectors[(row, order[col])]
        });
        let retained: Array1<f64> = order[..keep].iter().map(|&i| eigenvalues[i]).collect();

        debug!(channels = n_channels, kept = keep, eigenvalues = ?retained.to_vec(), "CSP fitted");

        self.classes = covariances.classes().collect();
        self.filters = Some(filters);
        self.eigenvalues = Some(retained);
        Ok(self)
    }

    /// Project epochs onto the learned filters and average the squared
    /// projection over time.
    ///
    /// Output shape is (epochs, components).
    ///
    /// # Errors
    ///
    /// - [`CspError::NotFitted`] before [`Self::fit`]
    /// - [`CspError::Validation`] when the channel count differs from fit
    ///   time or epochs have no samples
    pub fn transform(&self, epochs: ArrayView3<'_, f64>) -> CspResult<Array2<f64>> {
        let filters = self.filters.as_ref().ok_or(CspError::NotFitted)?;
        let (n_epochs, n_channels, n_samples) = epochs.dim();

        if n_channels != filters.nrows() {
            return Err(ValidationError::ChannelMismatch {
                expected: filters.nrows(),
                got: n_channels,
            }
            .into());
        }
        if n_samples == 0 {
            return Err(ValidationError::EmptyAxis { axis: "samples" }.into());
        }

        let mut features = Array2::<f64>::zeros((n_epochs, filters.ncols()));
        for (epoch, mut row) in epochs.axis_iter(Axis(0)).zip(features.axis_iter_mut(Axis(0))) {
            let projected = filters.t().dot(&epoch);
            if let Some(power) = projected.mapv(|v| v * v).mean_axis(Axis(1)) {
                row.assign(&power);
            }
        }

        Ok(features)
    }

    /// Fit, then transform the same epochs.
    pub fn fit_transform(
        &mut self,
        epochs: ArrayView3<'_, f64>,
        labels: &[ClassLabel],
    ) -> CspResult<Array2<f64>> {
        self.fit(epochs, labels)?.transform(epochs)
    }

    /// Learned filters (channels × components)
    #[must_use]
    pub fn filters(&self) -> Option<&Array2<f64>> {
        self.filters.as_ref()
    }

    /// Eigenvalues of the retained components, in filter column order
    #[must_use]
    pub fn eigenvalues(&self) -> Option<&Array1<f64>> {
        self.eigenvalues.as_ref()
    }

    /// Classes seen at fit time, ascending
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Whether [`Self::fit`] has succeeded
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.filters.is_some()
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &SpatialFilterConfig {
        &self.config
    }
}

impl Default for CommonSpatialPattern {
    fn default() -> Self {
        Self::new(SpatialFilterConfig::default())
    }
}

/// Solve `A v = λ (A + B) v` for symmetric `A`, `B` with `A + B` positive definite.
///
/// Reduces to a standard symmetric problem through the Cholesky factor
/// `A + B = L Lᵀ`: the eigenvectors `w` of `L⁻¹ A L⁻ᵀ` map back to
/// `v = L⁻ᵀ w`, normalised so that `vᵀ (A + B) v = 1`.
///
/// `regularization` adds `r · trace(A + B) / n` to the pooled diagonal.
/// Returns `None` when the pooled matrix is not positive definite.
pub fn generalized_eigh(
    a: &Array2<f64>,
    b: &Array2<f64>,
    regularization: f64,
) -> Option<(Vec<f64>, DMatrix<f64>)> {
    let n = a.nrows();
    let a = to_dmatrix(a);
    let mut pooled = &a + to_dmatrix(b);

    if regularization > 0.0 {
        let load = regularization * pooled.trace() / n as f64;
        for i in 0..n {
            pooled[(i, i)] += load;
        }
    }

    let l = pooled.cholesky()?.l();
    let left = l.solve_lower_triangular(&a)?;
    let reduced = l.solve_lower_triangular(&left.transpose())?;
    let reduced = (&reduced + reduced.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(reduced);
    let vectors = l.transpose().solve_upper_triangular(&eigen.eigenvectors)?;

    Some((eigen.eigenvalues.iter().copied().collect(), vectors))
}

/// Indices of `eigenvalues` sorted by distance from 0.5, largest first.
///
/// Ties keep their original relative order.
#[must_use]
pub fn discriminative_order(eigenvalues: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&i, &j| {
        let di = (eigenvalues[i] - 0.5).abs();
        let dj = (eigenvalues[j] - 0.5).abs();
        dj.total_cmp(&di)
    });
    order
}

fn to_dmatrix(m: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = m.dim();
    DMatrix::from_fn(rows, cols, |i, j| m[[i, j]])
}
