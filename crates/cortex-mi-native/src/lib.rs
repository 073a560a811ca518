//! Cortex MI Native - host-side motor-imagery decoding
//!
//! This crate provides everything between recordings on disk and accuracy
//! figures:
//! - EDF+ reading, band-pass filtering and epoch extraction
//! - Common Spatial Pattern (CSP) spatial filtering
//! - Feature scaling and logistic-regression classification
//! - Cross-validated training with persisted artifacts
//! - Evaluation of persisted pipelines on held-out epochs
//!
//! # Modules
//!
//! - [`dataset`]: Recording access, epochs and train/test split
//! - [`processing`]: Filters, covariance estimation and CSP
//! - [`ml`]: Scaler, classifier, pipeline and cross-validation
//! - [`artifacts`]: Storage of trained pipelines and test splits
//! - [`workflow`]: Training, evaluation and batch sweeps

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod artifacts;
pub mod dataset;
pub mod error;
pub mod ml;
pub mod processing;
pub mod workflow;

// Re-export key types
pub use artifacts::{ArtifactRegistry, ArtifactStatus, FsArtifactRegistry, MemoryArtifactRegistry};
pub use dataset::{DatasetSplit, EpochSource, LabeledEpochs, PhysionetLoader, RawRecording};
pub use error::{ArtifactError, CspError, DatasetError, ModelError, WorkflowError, WorkflowResult};
pub use ml::{Classifier, MotorImageryPipeline, Pipeline};
pub use processing::CommonSpatialPattern;
pub use workflow::{Evaluator, PredictionReport, Trainer, TrainingReport};
