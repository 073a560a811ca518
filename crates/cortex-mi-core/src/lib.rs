//! Cortex MI Core - shared vocabulary for motor-imagery classification
//!
//! This crate provides the foundational types used by every tier of the
//! Cortex MI system: identifiers for subjects, runs and tasks, the task
//! catalog that maps a task to its recording runs, keys for persisted
//! artifacts, and the experiment configuration.
//!
//! # Modules
//!
//! - [`types`]: Subject/task/run identifiers, task catalog, artifact keys
//! - [`config`]: Experiment configuration (preprocessing, split, model)
//! - [`error`]: Input validation errors
//!
//! # Example
//!
//! ```rust
//! use cortex_mi_core::types::{TaskCatalog, TaskId};
//!
//! let catalog = TaskCatalog::default();
//! let task = catalog.get(TaskId::new(2)).unwrap();
//! assert_eq!(task.runs().iter().map(|r| r.get()).collect::<Vec<_>>(), vec![4, 8, 12]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    ClassifierConfig, ExperimentConfig, PreprocessConfig, SpatialFilterConfig, SplitConfig,
};
pub use error::ValidationError;
pub use types::{ArtifactKey, ClassLabel, RunId, SubjectId, TaskCatalog, TaskDefinition, TaskId};
