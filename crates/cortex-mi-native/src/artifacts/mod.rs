//! Persisted training results
//!
//! A trained (subject, task) pair leaves two artifacts behind: the fitted
//! pipeline and the held-out test split it was evaluated on. An
//! [`ArtifactRegistry`] stores both under an [`ArtifactKey`]; a pair is only
//! usable when both are present.
//!
//! # Example
//!
//! ```rust,ignore
//! use cortex_mi_native::artifacts::{ArtifactRegistry, FsArtifactRegistry};
//!
//! let registry = FsArtifactRegistry::new("./data");
//! registry.save(key, &pipeline, &split.test)?;
//!
//! let trained = registry.load(key)?;
//! let accuracy = trained.pipeline.score(trained.test.view(), &trained.test.y)?;
//! ```

pub mod fs;
pub mod memory;

use serde::{Deserialize, Serialize};

use cortex_mi_core::ArtifactKey;

use crate::dataset::split::LabeledEpochs;
use crate::error::{ArtifactError, ArtifactResult};
use crate::ml::MotorImageryPipeline;

pub use fs::FsArtifactRegistry;
pub use memory::MemoryArtifactRegistry;

/// Version written into every pipeline envelope
pub const FORMAT_VERSION: u32 = 1;

/// Storage state of one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Nothing stored
    Missing,
    /// Only one of pipeline and test split stored
    Partial,
    /// Both stored
    Ready {
        /// Unix seconds of the training run
        trained_at: u64,
    },
}

impl ArtifactStatus {
    /// Whether the key can be loaded
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// A pipeline with the test split it was trained alongside.
#[derive(Clone, Debug)]
pub struct TrainedArtifact {
    /// Fitted pipeline
    pub pipeline: MotorImageryPipeline,
    /// Held-out epochs
    pub test: LabeledEpochs,
    /// Unix seconds of the training run
    pub trained_at: u64,
}

/// Serialized form of a fitted pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineEnvelope {
    /// Layout version of this envelope
    pub format_version: u32,
    /// Key the pipeline was trained for
    pub key: ArtifactKey,
    /// Unix seconds of the training run
    pub trained_at_unix: u64,
    /// The fitted pipeline
    pub pipeline: MotorImageryPipeline,
}

impl PipelineEnvelope {
    /// Wrap a pipeline stamped with the current time.
    #[must_use]
    pub fn new(key: ArtifactKey, pipeline: MotorImageryPipeline) -> Self {
        let trained_at_unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            format_version: FORMAT_VERSION,
            key,
            trained_at_unix,
            pipeline,
        }
    }

    /// Parse and check an envelope read back for `key`.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::Serialization`] for unparsable JSON and
    /// [`ArtifactError::Corrupt`] for a version or key mismatch.
    pub fn decode(key: ArtifactKey, json: &str) -> ArtifactResult<Self> {
        let envelope: Self = serde_json::from_str(json)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Corrupt {
                key,
                reason: format!("unsupported format version {}", envelope.format_version),
            });
        }
        if envelope.key != key {
            return Err(ArtifactError::Corrupt {
                key,
                reason: format!("stored under {} instead", envelope.key),
            });
        }
        Ok(envelope)
    }
}

/// Keyed storage for trained pipelines and their test splits.
pub trait ArtifactRegistry {
    /// Whether `key` has nothing, half or all of its artifacts.
    fn status(&self, key: ArtifactKey) -> ArtifactResult<ArtifactStatus>;

    /// Store (replacing) both artifacts of `key`.
    fn save(&self, key: ArtifactKey, pipeline: &MotorImageryPipeline, test: &LabeledEpochs) -> ArtifactResult<()>;

    /// Load both artifacts of `key`.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::NotTrained`] unless both artifacts are present.
    fn load(&self, key: ArtifactKey) -> ArtifactResult<TrainedArtifact>;

    /// Delete whatever is stored under `key`.
    fn remove(&self, key: ArtifactKey) -> ArtifactResult<()>;
}
