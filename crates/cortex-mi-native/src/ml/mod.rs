//! Machine learning for motor-imagery decoding
//!
//! Feature scaling, a binary linear classifier, the CSP → scaler → classifier
//! pipeline and k-fold cross-validation.

pub mod cross_validation;
pub mod logistic;
pub mod pipeline;
pub mod scaler;

use ndarray::ArrayView2;

use cortex_mi_core::{ClassLabel, ValidationError};

use crate::error::ModelResult;

pub use cross_validation::{cross_val_score, Fold, KFold};
pub use logistic::LogisticRegression;
pub use pipeline::{MotorImageryPipeline, Pipeline};
pub use scaler::StandardScaler;

/// Fit/predict contract for the final stage of a [`Pipeline`].
///
/// Features are (samples × features); one label per sample.
pub trait Classifier {
    /// Learn from labeled feature rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the data violates the model's requirements.
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[ClassLabel]) -> ModelResult<()>;

    /// Predict one label per feature row.
    ///
    /// # Errors
    ///
    /// Returns an error before [`Classifier::fit`] or on a feature count mismatch.
    fn predict(&self, features: ArrayView2<'_, f64>) -> ModelResult<Vec<ClassLabel>>;

    /// Whether the model has been fitted
    fn is_fitted(&self) -> bool;
}

/// Fraction of positions where `predicted` equals `expected`.
///
/// # Errors
///
/// [`ValidationError::LengthMismatch`] for different lengths and
/// [`ValidationError::EmptyAxis`] for empty input.
pub fn accuracy(predicted: &[ClassLabel], expected: &[ClassLabel]) -> Result<f64, ValidationError> {
    if predicted.len() != expected.len() {
        return Err(ValidationError::LengthMismatch {
            epochs: predicted.len(),
            labels: expected.len(),
        });
    }
    if expected.is_empty() {
        return Err(ValidationError::EmptyAxis { axis: "epochs" });
    }

    let correct = predicted.iter().zip(expected).filter(|(p, e)| p == e).count();
    Ok(correct as f64 / expected.len() as f64)
}
