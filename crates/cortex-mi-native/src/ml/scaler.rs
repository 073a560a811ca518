//! Per-feature standardisation
//!
//! Centers every feature column on its training mean and divides by its
//! population standard deviation. Columns with zero variance keep unit scale
//! so they map to zero instead of NaN.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use cortex_mi_core::ValidationError;

use crate::error::{ModelError, ModelResult};

/// Learned mean and scale per feature column.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    /// Create an unfitted scaler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn column means and standard deviations.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyAxis`] when there are no rows or no columns.
    pub fn fit(&mut self, features: ArrayView2<'_, f64>) -> ModelResult<&mut Self> {
        if features.ncols() == 0 {
            return Err(ValidationError::EmptyAxis { axis: "features" }.into());
        }
        let mean = features
            .mean_axis(Axis(0))
            .ok_or(ValidationError::EmptyAxis { axis: "samples" })?;

        let scale = features
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > f64::EPSILON { std } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Standardise feature rows with the learned statistics.
    ///
    /// # Errors
    ///
    /// [`ModelError::NotFitted`] before [`Self::fit`], and
    /// [`ValidationError::FeatureMismatch`] for a different column count.
    pub fn transform(&self, features: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(ModelError::NotFitted { component: "StandardScaler" });
        };
        if features.ncols() != mean.len() {
            return Err(ValidationError::FeatureMismatch {
                expected: mean.len(),
                got: features.ncols(),
            }
            .into());
        }

        Ok((&features - mean) / scale)
    }

    /// Fit, then transform the same rows.
    pub fn fit_transform(&mut self, features: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        self.fit(features)?.transform(features)
    }

    /// Learned column means
    #[must_use]
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Learned column scales
    #[must_use]
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    /// Whether [`Self::fit`] has succeeded
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardises_columns() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(x.view()).unwrap();

        let mean = z.mean_axis(Axis(0)).unwrap();
        assert!(mean[0].abs() < 1e-12);
        assert!((z.std_axis(Axis(0), 0.0)[0] - 1.0).abs() < 1e-12);

        // Constant column maps to zero
        assert!(z.column(1).iter().all(|v| v.abs() < 1e-12));
        assert!((scaler.scale().unwrap()[1] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uses_training_statistics() {
        let mut scaler = StandardScaler::new();
        scaler.fit(array![[0.0], [2.0]].view()).unwrap();

        let z = scaler.transform(array![[4.0]].view()).unwrap();
        assert!((z[[0, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(array![[1.0]].view()),
            Err(ModelError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_feature_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap();
        assert!(matches!(
            scaler.transform(array![[1.0]].view()),
            Err(ModelError::Validation(ValidationError::FeatureMismatch { expected: 2, got: 1 }))
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let mut scaler = StandardScaler::new();
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(scaler.fit(empty.view()).is_err());
    }
}
