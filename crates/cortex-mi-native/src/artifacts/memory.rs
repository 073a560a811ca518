//! In-process artifact registry
//!
//! Keeps pipelines in their serialized JSON envelope form so that saving and
//! loading exercise the same serde path as the file registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cortex_mi_core::ArtifactKey;

use crate::artifacts::{ArtifactRegistry, ArtifactStatus, PipelineEnvelope, TrainedArtifact};
use crate::dataset::split::LabeledEpochs;
use crate::error::{ArtifactError, ArtifactResult};
use crate::ml::MotorImageryPipeline;

#[derive(Debug, Default)]
struct Entry {
    pipeline_json: Option<String>,
    test: Option<LabeledEpochs>,
}

/// Registry held in memory; clones share storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryArtifactRegistry {
    entries: Arc<RwLock<HashMap<ArtifactKey, Entry>>>,
}

impl MemoryArtifactRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with anything stored
    pub fn len(&self) -> ArtifactResult<usize> {
        Ok(self.entries.read().map_err(|_| ArtifactError::Locked)?.len())
    }

    /// Drop the test split of `key`, leaving a partial entry.
    pub fn discard_test_split(&self, key: ArtifactKey) -> ArtifactResult<()> {
        let mut entries = self.entries.write().map_err(|_| ArtifactError::Locked)?;
        if let Some(entry) = entries.get_mut(&key) {
            entry.test = None;
        }
        Ok(())
    }
}

impl ArtifactRegistry for MemoryArtifactRegistry {
    fn status(&self, key: ArtifactKey) -> ArtifactResult<ArtifactStatus> {
        let entries = self.entries.read().map_err(|_| ArtifactError::Locked)?;
        let Some(entry) = entries.get(&key) else {
            return Ok(ArtifactStatus::Missing);
        };

        match (&entry.pipeline_json, &entry.test) {
            (Some(json), Some(_)) => Ok(ArtifactStatus::Ready {
                trained_at: PipelineEnvelope::decode(key, json)?.trained_at_unix,
            }),
            (None, None) => Ok(ArtifactStatus::Missing),
            _ => Ok(ArtifactStatus::Partial),
        }
    }

    fn save(&self, key: ArtifactKey, pipeline: &MotorImageryPipeline, test: &LabeledEpochs) -> ArtifactResult<()> {
        let json = serde_json::to_string(&PipelineEnvelope::new(key, pipeline.clone()))?;

        let mut entries = self.entries.write().map_err(|_| ArtifactError::Locked)?;
        entries.insert(
            key,
            Entry {
                pipeline_json: Some(json),
                test: Some(test.clone()),
            },
        );
        Ok(())
    }

    fn load(&self, key: ArtifactKey) -> ArtifactResult<TrainedArtifact> {
        let entries = self.entries.read().map_err(|_| ArtifactError::Locked)?;
        let Some(Entry {
            pipeline_json: Some(json),
            test: Some(test),
        }) = entries.get(&key)
        else {
            return Err(ArtifactError::NotTrained { key });
        };

        let envelope = PipelineEnvelope::decode(key, json)?;
        Ok(TrainedArtifact {
            pipeline: envelope.pipeline,
            test: test.clone(),
            trained_at: envelope.trained_at_unix,
        })
    }

    fn remove(&self, key: ArtifactKey) -> ArtifactResult<()> {
        self.entries.write().map_err(|_| ArtifactError::Locked)?.remove(&key);
        Ok(())
    }
}
