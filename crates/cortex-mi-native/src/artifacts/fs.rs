//! Directory-backed artifact registry
//!
//! Layout under the registry root:
//!
//! ```text
//! pipeline_s{S}_t{T}.json   PipelineEnvelope (serde_json)
//! test_data_s{S}_t{T}.npz   arrays `x` (epochs × channels × samples) and `y` (labels)
//! ```
//!
//! Each file is written to a temporary file in the same directory and then
//! renamed over the target, so a reader never observes a half-written file.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use ndarray::{Array, Array1, Dimension};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpzError, ReadableElement};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use cortex_mi_core::ArtifactKey;

use crate::artifacts::{ArtifactRegistry, ArtifactStatus, PipelineEnvelope, TrainedArtifact};
use crate::dataset::split::LabeledEpochs;
use crate::error::{ArtifactError, ArtifactResult};
use crate::ml::MotorImageryPipeline;

/// Registry storing artifacts as files in one directory.
#[derive(Clone, Debug)]
pub struct FsArtifactRegistry {
    root: PathBuf,
}

impl FsArtifactRegistry {
    /// Registry rooted at `root`; the directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registry directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the pipeline envelope for `key`
    #[must_use]
    pub fn pipeline_path(&self, key: ArtifactKey) -> PathBuf {
        self.root.join(format!("pipeline_{key}.json"))
    }

    /// Location of the test split archive for `key`
    #[must_use]
    pub fn test_data_path(&self, key: ArtifactKey) -> PathBuf {
        self.root.join(format!("test_data_{key}.npz"))
    }

    fn write_pipeline(&self, key: ArtifactKey, pipeline: &MotorImageryPipeline) -> ArtifactResult<()> {
        let envelope = PipelineEnvelope::new(key, pipeline.clone());
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer(tmp.as_file_mut(), &envelope)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.pipeline_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_test_data(&self, key: ArtifactKey, test: &LabeledEpochs) -> ArtifactResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        {
            let mut npz = NpzWriter::new(tmp.as_file_mut());
            npz.add_array("x", &test.x)?;
            npz.add_array("y", &Array1::from(test.y.clone()))?;
            npz.finish()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.test_data_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn read_envelope(&self, key: ArtifactKey) -> ArtifactResult<Option<PipelineEnvelope>> {
        match fs::read_to_string(self.pipeline_path(key)) {
            Ok(json) => PipelineEnvelope::decode(key, &json).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_test_data(&self, key: ArtifactKey) -> ArtifactResult<Option<LabeledEpochs>> {
        let file = match File::open(self.test_data_path(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut npz = NpzReader::new(BufReader::new(file))?;
        let x = read_array(&mut npz, "x")?;
        let y: Array1<i32> = read_array(&mut npz, "y")?;

        LabeledEpochs::new(x, y.to_vec())
            .map(Some)
            .map_err(|e| ArtifactError::Corrupt { key, reason: e.to_string() })
    }
}

/// Read an array stored by [`NpzWriter::add_array`] under `name`.
fn read_array<R, A, D>(npz: &mut NpzReader<R>, name: &str) -> Result<Array<A, D>, ReadNpzError>
where
    R: std::io::Read + std::io::Seek,
    A: ReadableElement,
    D: Dimension,
{
    match npz.by_name(&format!("{name}.npy")) {
        Ok(array) => Ok(array),
        Err(_) => npz.by_name(name),
    }
}

impl ArtifactRegistry for FsArtifactRegistry {
    fn status(&self, key: ArtifactKey) -> ArtifactResult<ArtifactStatus> {
        let has_test = self.test_data_path(key).exists();
        match (self.read_envelope(key)?, has_test) {
            (Some(envelope), true) => Ok(ArtifactStatus::Ready {
                trained_at: envelope.trained_at_unix,
            }),
            (None, false) => Ok(ArtifactStatus::Missing),
            _ => Ok(ArtifactStatus::Partial),
        }
    }

    fn save(&self, key: ArtifactKey, pipeline: &MotorImageryPipeline, test: &LabeledEpochs) -> ArtifactResult<()> {
        fs::create_dir_all(&self.root)?;

        // Each file is replaced atomically; the pair is not.
        self.write_test_data(key, test)?;
        self.write_pipeline(key, pipeline)?;

        info!(%key, root = %self.root.display(), "Artifacts saved");
        Ok(())
    }

    fn load(&self, key: ArtifactKey) -> ArtifactResult<TrainedArtifact> {
        let (Some(envelope), Some(test)) = (self.read_envelope(key)?, self.read_test_data(key)?) else {
            return Err(ArtifactError::NotTrained { key });
        };

        debug!(%key, epochs = test.len(), "Artifacts loaded");
        Ok(TrainedArtifact {
            pipeline: envelope.pipeline,
            test,
            trained_at: envelope.trained_at_unix,
        })
    }

    fn remove(&self, key: ArtifactKey) -> ArtifactResult<()> {
        for path in [self.pipeline_path(key), self.test_data_path(key)] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_mi_core::{SubjectId, TaskId};
    use ndarray::Array3;
    use tempfile::TempDir;

    fn key() -> ArtifactKey {
        ArtifactKey::new(SubjectId::new(4).unwrap(), TaskId::new(2))
    }

    fn test_split() -> LabeledEpochs {
        let x = Array3::from_shape_fn((3, 2, 5), |(e, c, s)| (e * 100 + c * 10 + s) as f64 * 1e-6);
        LabeledEpochs::new(x, vec![1, 2, 1]).unwrap()
    }

    #[test]
    fn test_file_names() {
        let registry = FsArtifactRegistry::new("/tmp/artifacts");
        assert_eq!(registry.pipeline_path(key()), Path::new("/tmp/artifacts/pipeline_s4_t2.json"));
        assert_eq!(registry.test_data_path(key()), Path::new("/tmp/artifacts/test_data_s4_t2.npz"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let registry = FsArtifactRegistry::new(dir.path().join("nested"));
        assert_eq!(registry.status(key()).unwrap(), ArtifactStatus::Missing);

        registry.save(key(), &MotorImageryPipeline::default(), &test_split()).unwrap();
        assert!(registry.status(key()).unwrap().is_ready());

        let loaded = registry.load(key()).unwrap();
        assert_eq!(loaded.test, test_split());
        assert!(!loaded.pipeline.is_fitted());
    }

    #[test]
    fn test_partial_is_not_trained() {
        let dir = TempDir::new().unwrap();
        let registry = FsArtifactRegistry::new(dir.path());
        registry.save(key(), &MotorImageryPipeline::default(), &test_split()).unwrap();
        fs::remove_file(registry.test_data_path(key())).unwrap();

        assert_eq!(registry.status(key()).unwrap(), ArtifactStatus::Partial);
        assert!(matches!(registry.load(key()), Err(ArtifactError::NotTrained { .. })));
    }

    #[test]
    fn test_missing_is_not_trained() {
        let dir = TempDir::new().unwrap();
        let registry = FsArtifactRegistry::new(dir.path());
        assert!(matches!(registry.load(key()), Err(ArtifactError::NotTrained { .. })));
    }

    #[test]
    fn test_save_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let registry = FsArtifactRegistry::new(dir.path());
        registry.save(key(), &MotorImageryPipeline::default(), &test_split()).unwrap();

        let smaller = LabeledEpochs::new(Array3::zeros((1, 2, 5)), vec![2]).unwrap();
        registry.save(key(), &MotorImageryPipeline::default(), &smaller).unwrap();
        assert_eq!(registry.load(key()).unwrap().test, smaller);

        // No temporary files left behind
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let registry = FsArtifactRegistry::new(dir.path());
        registry.save(key(), &MotorImageryPipeline::default(), &test_split()).unwrap();

        registry.remove(key()).unwrap();
        assert_eq!(registry.status(key()).unwrap(), ArtifactStatus::Missing);
        // Removing again is a no-op
        registry.remove(key()).unwrap();
    }

    #[test]
    fn test_corrupt_envelope() {
        let dir = TempDir::new().unwrap();
        let registry = FsArtifactRegistry::new(dir.path());
        registry.save(key(), &MotorImageryPipeline::default(), &test_split()).unwrap();
        fs::write(registry.pipeline_path(key()), "{ not json").unwrap();

        assert!(matches!(registry.load(key()), Err(ArtifactError::Serialization(_))));
    }
}
