//! Experiment configuration.
//!
//! Every tunable of a training/evaluation run lives here: where recordings and
//! artifacts are stored, how continuous recordings become epochs, how epochs
//! are split, and the model hyperparameters. All types implement `Default`
//! with the values used for the reference experiments and round-trip through
//! serde so a run can be described by a JSON file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{ClassLabel, TaskCatalog};

// ============================================================================
// Preprocessing
// ============================================================================

/// How continuous recordings are filtered and cut into epochs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Band-pass lower edge in Hz
    pub low_hz: f64,
    /// Band-pass upper edge in Hz
    pub high_hz: f64,
    /// Optional power-line notch frequency in Hz, applied before the band-pass
    pub notch_hz: Option<f64>,
    /// Epoch start relative to event onset, in seconds
    pub tmin_s: f64,
    /// Epoch end relative to event onset, in seconds (inclusive)
    pub tmax_s: f64,
    /// Subtract the pre-onset mean from each channel when `tmin_s < 0`
    pub baseline: bool,
    /// Annotation description → class label
    pub event_map: Vec<(String, ClassLabel)>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            low_hz: 7.0,
            high_hz: 30.0,
            notch_hz: None,
            tmin_s: -1.0,
            tmax_s: 4.0,
            baseline: true,
            event_map: vec![("T1".to_string(), 1), ("T2".to_string(), 2)],
        }
    }
}

impl PreprocessConfig {
    /// Check band edges and epoch window.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.low_hz > 0.0 && self.low_hz < self.high_hz) {
            return Err(ValidationError::InvalidParameter {
                parameter: "low_hz/high_hz",
                reason: format!("need 0 < low < high, got {}..{}", self.low_hz, self.high_hz),
            });
        }
        if let Some(notch) = self.notch_hz {
            if notch <= 0.0 || !notch.is_finite() {
                return Err(ValidationError::out_of_range("notch_hz", "positive", notch));
            }
        }
        if self.tmin_s >= self.tmax_s {
            return Err(ValidationError::InvalidParameter {
                parameter: "tmin_s/tmax_s",
                reason: format!("need tmin < tmax, got {}..{}", self.tmin_s, self.tmax_s),
            });
        }
        if self.event_map.is_empty() {
            return Err(ValidationError::InvalidParameter {
                parameter: "event_map",
                reason: "no annotation is mapped to a class".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Train/Test Split
// ============================================================================

/// How epochs are divided into training and held-out test sets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of epochs held out for testing (0 < f < 1)
    pub test_fraction: f64,
    /// Seed of the shuffling generator
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

// ============================================================================
// Model Hyperparameters
// ============================================================================

/// Spatial filter hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialFilterConfig {
    /// Number of components kept; `None` keeps all channels
    pub n_components: Option<usize>,
    /// Diagonal loading of the pooled covariance, as a fraction of its mean
    /// eigenvalue. Zero solves the bare generalized problem.
    pub regularization: f64,
}

impl Default for SpatialFilterConfig {
    fn default() -> Self {
        Self {
            n_components: Some(4),
            regularization: 0.0,
        }
    }
}

/// Logistic regression hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Inverse L2 penalty strength
    pub c: f64,
    /// Newton iteration cap
    pub max_iter: usize,
    /// Convergence tolerance on the largest gradient component
    pub tol: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// Complete description of a training/evaluation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Root of the recording tree (`S001/S001R03.edf`, ...)
    pub data_dir: PathBuf,
    /// Directory holding persisted pipelines and test splits
    pub artifact_dir: PathBuf,
    /// Filtering and epoching
    pub preprocess: PreprocessConfig,
    /// Train/test split
    pub split: SplitConfig,
    /// Spatial filter
    pub spatial_filter: SpatialFilterConfig,
    /// Classifier
    pub classifier: ClassifierConfig,
    /// Number of cross-validation folds
    pub cv_folds: usize,
    /// Task ordinal → run triple mapping
    pub catalog: TaskCatalog,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./datasets"),
            artifact_dir: PathBuf::from("./data"),
            preprocess: PreprocessConfig::default(),
            split: SplitConfig::default(),
            spatial_filter: SpatialFilterConfig::default(),
            classifier: ClassifierConfig::default(),
            cv_folds: 10,
            catalog: TaskCatalog::default(),
        }
    }
}

impl ExperimentConfig {
    /// Check every section for unusable values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.preprocess.validate()?;

        if !(self.split.test_fraction > 0.0 && self.split.test_fraction < 1.0) {
            return Err(ValidationError::out_of_range(
                "test_fraction",
                "strictly between 0 and 1",
                self.split.test_fraction,
            ));
        }
        if self.cv_folds < 2 {
            return Err(ValidationError::out_of_range("cv_folds", "at least 2", self.cv_folds));
        }
        if self.spatial_filter.n_components == Some(0) {
            return Err(ValidationError::out_of_range("n_components", "at least 1", 0));
        }
        if self.spatial_filter.regularization < 0.0 {
            return Err(ValidationError::out_of_range(
                "regularization",
                "non-negative",
                self.spatial_filter.regularization,
            ));
        }
        if self.classifier.c <= 0.0 {
            return Err(ValidationError::out_of_range("c", "positive", self.classifier.c));
        }
        Ok(())
    }
}
