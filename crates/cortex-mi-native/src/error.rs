//! Error types for native processing
//!
//! Error types for the spatial filter, classifier, dataset loading, artifact
//! storage and workflows using `thiserror`.

use std::path::PathBuf;

use cortex_mi_core::{ArtifactKey, ValidationError};
use thiserror::Error;

/// Spatial filter error types
#[derive(Error, Debug)]
pub enum CspError {
    /// Input violated the estimator contract
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Transform requested before fit
    #[error("The spatial filter has not been fitted")]
    NotFitted,

    /// Pooled class covariance is not positive definite
    #[error("Pooled covariance of classes {class_a} and {class_b} is not positive definite; the generalized eigenproblem is ill-posed")]
    IllConditioned {
        /// First contrasted class
        class_a: i32,
        /// Second contrasted class
        class_b: i32,
    },
}

/// Classifier and pipeline error types
#[derive(Error, Debug)]
pub enum ModelError {
    /// Input violated the model contract
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Spatial filter stage failed
    #[error("Spatial filter error: {0}")]
    Csp(#[from] CspError),

    /// Prediction requested before fit
    #[error("{component} has not been fitted")]
    NotFitted {
        /// Component that is unfitted
        component: &'static str,
    },

    /// The classifier only separates two classes
    #[error("Binary classifier received {found} classes")]
    NotBinary {
        /// Distinct labels found
        found: usize,
    },

    /// Newton step could not be solved
    #[error("Hessian is not positive definite at iteration {iteration}")]
    SingularHessian {
        /// Iteration at which the solve failed
        iteration: usize,
    },
}

/// Dataset loading error types
#[derive(Error, Debug)]
pub enum DatasetError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Recording file absent from the data directory
    #[error("Recording not found: {path}")]
    MissingRecording {
        /// Expected file location
        path: PathBuf,
    },

    /// Malformed EDF content
    #[error("Invalid EDF file {path}: {reason}")]
    Edf {
        /// Offending file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// Recordings cannot be joined
    #[error("Cannot concatenate recordings: {reason}")]
    Incompatible {
        /// Why the recordings differ
        reason: String,
    },

    /// No annotation produced an epoch inside the recording
    #[error("No epochs extracted for events {events:?}")]
    NoEpochs {
        /// Event descriptions that were searched for
        events: Vec<String>,
    },

    /// Input violated a loader contract
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

/// Artifact storage error types
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// No complete pipeline/test-split pair is stored under the key
    #[error("Model not trained for subject {} on task {}", key.subject, key.task)]
    NotTrained {
        /// Key that was looked up
        key: ArtifactKey,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Test split archive could not be written
    #[error("Failed to write test split: {0}")]
    WriteArchive(#[from] ndarray_npy::WriteNpzError),

    /// Test split archive could not be read
    #[error("Failed to read test split: {0}")]
    ReadArchive(#[from] ndarray_npy::ReadNpzError),

    /// Stored artifact does not match what was requested
    #[error("Corrupt artifact for {key}: {reason}")]
    Corrupt {
        /// Key that was looked up
        key: ArtifactKey,
        /// What did not match
        reason: String,
    },

    /// Registry lock poisoned
    #[error("Artifact registry is locked")]
    Locked,
}

/// Training and evaluation workflow error types
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Loading the dataset failed
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Fitting or scoring the pipeline failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Reading or writing artifacts failed
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Invalid identifiers or configuration
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl WorkflowError {
    /// Whether this error means "no trained model for this key".
    ///
    /// Batch sweeps use this to skip untrained (subject, task) pairs.
    #[must_use]
    pub fn is_not_trained(&self) -> bool {
        matches!(self, Self::Artifact(ArtifactError::NotTrained { .. }))
    }
}

/// Result type for spatial filter operations
pub type CspResult<T> = Result<T, CspError>;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Result type for artifact operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
