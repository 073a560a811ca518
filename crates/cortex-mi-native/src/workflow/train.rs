//! Training orchestration
//!
//! Loads a split, cross-validates an unfitted pipeline on the training part,
//! fits it on the whole training part, persists it next to the held-out test
//! part and scores both.

use serde::Serialize;
use tracing::info;

use cortex_mi_core::{ArtifactKey, ExperimentConfig, SubjectId, TaskId};

use crate::artifacts::ArtifactRegistry;
use crate::dataset::loader::EpochSource;
use crate::error::WorkflowResult;
use crate::ml::{cross_val_score, KFold, MotorImageryPipeline};

/// Scores of one training run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Trained pair
    pub key: ArtifactKey,
    /// Accuracy of every cross-validation fold
    pub cv_scores: Vec<f64>,
    /// Accuracy on the training part
    pub train_score: f64,
    /// Accuracy on the held-out test part
    pub test_score: f64,
    /// Epochs used for fitting
    pub n_train: usize,
    /// Epochs held out
    pub n_test: usize,
}

impl TrainingReport {
    /// Mean cross-validation accuracy
    #[must_use]
    pub fn cv_mean(&self) -> f64 {
        if self.cv_scores.is_empty() {
            0.0
        } else {
            self.cv_scores.iter().sum::<f64>() / self.cv_scores.len() as f64
        }
    }
}

/// Trains and persists pipelines.
#[derive(Clone, Debug)]
pub struct Trainer<S, R> {
    source: S,
    registry: R,
    config: ExperimentConfig,
}

impl<S: EpochSource, R: ArtifactRegistry> Trainer<S, R> {
    /// Create a trainer reading from `source` and writing to `registry`.
    pub fn new(source: S, registry: R, config: ExperimentConfig) -> Self {
        Self {
            source,
            registry,
            config,
        }
    }

    /// Train, persist and score the pipeline of one pair.
    ///
    /// # Errors
    ///
    /// Dataset (including an unknown task), model or artifact failures.
    pub fn train(&self, subject: SubjectId, task: TaskId) -> WorkflowResult<TrainingReport> {
        let key = ArtifactKey::new(subject, task);
        info!(%key, "Training");

        let split = self.source.load_split(subject, task)?;

        let template = MotorImageryPipeline::from_config(&self.config.spatial_filter, &self.config.classifier);
        let kfold = KFold::new(self.config.cv_folds)?;
        let cv_scores = cross_val_score(&template, split.train.view(), &split.train.y, &kfold)?;

        let mut pipeline = template;
        pipeline.fit(split.train.view(), &split.train.y)?;
        self.registry.save(key, &pipeline, &split.test)?;

        let report = TrainingReport {
            key,
            train_score: pipeline.score(split.train.view(), &split.train.y)?,
            test_score: pipeline.score(split.test.view(), &split.test.y)?,
            cv_scores,
            n_train: split.train.len(),
            n_test: split.test.len(),
        };

        info!(
            %key,
            cv_mean = report.cv_mean(),
            train = report.train_score,
            test = report.test_score,
            "Training complete"
        );
        Ok(report)
    }

    /// Experiment configuration
    #[must_use]
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Artifact registry written to
    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }
}
