//! CSP → scaler → classifier pipeline
//!
//! Raw epochs (epochs × channels × samples) go in, class labels come out. The
//! pipeline is the unit that is cross-validated, persisted and reloaded.

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cortex_mi_core::{ClassLabel, ClassifierConfig, SpatialFilterConfig};

use crate::error::ModelResult;
use crate::ml::{accuracy, Classifier, LogisticRegression, StandardScaler};
use crate::processing::csp::CommonSpatialPattern;

/// Spatial filter, feature scaler and classifier fitted together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pipeline<C = LogisticRegression> {
    csp: CommonSpatialPattern,
    scaler: StandardScaler,
    classifier: C,
}

/// The pipeline used for motor-imagery decoding
pub type MotorImageryPipeline = Pipeline<LogisticRegression>;

impl MotorImageryPipeline {
    /// Unfitted pipeline from hyperparameters.
    #[must_use]
    pub fn from_config(spatial: &SpatialFilterConfig, classifier: &ClassifierConfig) -> Self {
        Pipeline::new(
            CommonSpatialPattern::new(spatial.clone()),
            LogisticRegression::new(classifier.clone()),
        )
    }
}

impl<C: Classifier + Default> Default for Pipeline<C> {
    fn default() -> Self {
        Self::new(CommonSpatialPattern::default(), C::default())
    }
}

impl<C: Classifier> Pipeline<C> {
    /// Assemble a pipeline from an unfitted spatial filter and classifier.
    #[must_use]
    pub fn new(csp: CommonSpatialPattern, classifier: C) -> Self {
        Self {
            csp,
            scaler: StandardScaler::new(),
            classifier,
        }
    }

    /// Fit every stage in order on the same epochs.
    ///
    /// # Errors
    ///
    /// Propagates the first stage failure.
    pub fn fit(&mut self, epochs: ArrayView3<'_, f64>, labels: &[ClassLabel]) -> ModelResult<&mut Self> {
        let features = self.csp.fit_transform(epochs, labels)?;
        let scaled = self.scaler.fit_transform(features.view())?;
        self.classifier.fit(scaled.view(), labels)?;

        debug!(epochs = labels.len(), features = scaled.ncols(), "Pipeline fitted");
        Ok(self)
    }

    /// Predict one label per epoch.
    ///
    /// # Errors
    ///
    /// Fails before [`Self::fit`] or when the channel count differs from fit time.
    pub fn predict(&self, epochs: ArrayView3<'_, f64>) -> ModelResult<Vec<ClassLabel>> {
        let features = self.csp.transform(epochs)?;
        let scaled = self.scaler.transform(features.view())?;
        self.classifier.predict(scaled.view())
    }

    /// Mean accuracy on labeled epochs.
    pub fn score(&self, epochs: ArrayView3<'_, f64>, labels: &[ClassLabel]) -> ModelResult<f64> {
        let predicted = self.predict(epochs)?;
        Ok(accuracy(&predicted, labels)?)
    }

    /// Whether every stage is fitted
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.csp.is_fitted() && self.scaler.is_fitted() && self.classifier.is_fitted()
    }

    /// Spatial filter stage
    #[must_use]
    pub fn csp(&self) -> &CommonSpatialPattern {
        &self.csp
    }

    /// Scaling stage
    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Classifier stage
    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}
