//! Evaluation of persisted pipelines
//!
//! Reloads a pipeline with its held-out test split and predicts every test
//! epoch. Reporting is left to the caller.

use serde::Serialize;
use tracing::debug;

use cortex_mi_core::{ArtifactKey, ClassLabel};

use crate::artifacts::ArtifactRegistry;
use crate::error::WorkflowResult;

/// Outcome for one held-out epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EpochPrediction {
    /// Position in the test split
    pub index: usize,
    /// Predicted label
    pub predicted: ClassLabel,
    /// Recorded label
    pub expected: ClassLabel,
    /// Whether they match
    pub correct: bool,
}

/// Predictions for every epoch of a test split.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionReport {
    /// Evaluated pair
    pub key: ArtifactKey,
    /// Unix seconds of the training run
    pub trained_at: u64,
    /// One entry per test epoch, in split order
    pub predictions: Vec<EpochPrediction>,
}

impl PredictionReport {
    /// Fraction of correct predictions
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.predictions.is_empty() {
            return 0.0;
        }
        self.correct() as f64 / self.predictions.len() as f64
    }

    /// Number of correct predictions
    #[must_use]
    pub fn correct(&self) -> usize {
        self.predictions.iter().filter(|p| p.correct).count()
    }
}

/// Evaluates persisted pipelines.
#[derive(Clone, Debug)]
pub struct Evaluator<R> {
    registry: R,
}

impl<R: ArtifactRegistry> Evaluator<R> {
    /// Create an evaluator reading from `registry`.
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Predict the stored test split of `key`.
    ///
    /// # Errors
    ///
    /// `NotTrained` when either artifact is missing (see
    /// [`crate::error::WorkflowError::is_not_trained`]), or a model error.
    pub fn evaluate(&self, key: ArtifactKey) -> WorkflowResult<PredictionReport> {
        let trained = self.registry.load(key)?;
        let predicted = trained.pipeline.predict(trained.test.view())?;

        let predictions = predicted
            .into_iter()
            .zip(&trained.test.y)
            .enumerate()
            .map(|(index, (predicted, &expected))| EpochPrediction {
                index,
                predicted,
                expected,
                correct: predicted == expected,
            })
            .collect();

        let report = PredictionReport {
            key,
            trained_at: trained.trained_at,
            predictions,
        };
        debug!(%key, accuracy = report.accuracy(), "Evaluated");
        Ok(report)
    }
}
