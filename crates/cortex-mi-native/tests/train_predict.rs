//! End-to-end training, persistence and evaluation against synthetic epochs

use std::collections::HashSet;

use ndarray::Array3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use cortex_mi_core::{ArtifactKey, ClassLabel, ExperimentConfig, SubjectId, TaskCatalog, TaskId};
use cortex_mi_native::dataset::{train_test_split, DatasetSplit, EpochSource};
use cortex_mi_native::error::{DatasetError, DatasetResult};
use cortex_mi_native::workflow::{accuracy_sweep, train_all};
use cortex_mi_native::{
    ArtifactRegistry, ArtifactStatus, Evaluator, FsArtifactRegistry, MemoryArtifactRegistry, Trainer, WorkflowError,
};

/// Two-class epochs whose variance differs on channels 1 and 4; only the
/// subjects in `available` have data.
struct SyntheticSource {
    available: HashSet<u8>,
}

impl SyntheticSource {
    fn new(subjects: &[u8]) -> Self {
        Self {
            available: subjects.iter().copied().collect(),
        }
    }
}

impl EpochSource for SyntheticSource {
    fn load_split(&self, subject: SubjectId, task: TaskId) -> DatasetResult<DatasetSplit> {
        TaskCatalog::default().get(task)?;
        if !self.available.contains(&subject.get()) {
            return Err(DatasetError::MissingRecording {
                path: format!("S{:03}", subject.get()).into(),
            });
        }

        let seed = u64::from(subject.get()) * 10 + u64::from(task.get());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n_epochs = 60;
        let labels: Vec<ClassLabel> = (0..n_epochs).map(|e| if e % 2 == 0 { 1 } else { 2 }).collect();

        let epochs = Array3::from_shape_fn((n_epochs, 6, 100), |(e, c, _)| {
            let gain = match (c, labels[e]) {
                (1, 1) | (4, 2) => 3.0,
                _ => 1.0,
            };
            gain * (rng.gen::<f64>() - 0.5) * 1e-5
        });

        Ok(train_test_split(epochs.view(), &labels, 0.2, 42)?)
    }
}

fn key(subject: u8, task: u8) -> ArtifactKey {
    ArtifactKey::new(SubjectId::new(subject).unwrap(), TaskId::new(task))
}

#[test]
fn test_train_then_evaluate_from_disk() {
    let dir = TempDir::new().unwrap();
    let registry = FsArtifactRegistry::new(dir.path());
    let trainer = Trainer::new(SyntheticSource::new(&[1]), registry.clone(), ExperimentConfig::default());

    let report = trainer.train(SubjectId::new(1).unwrap(), TaskId::new(2)).unwrap();
    assert_eq!(report.cv_scores.len(), 10);
    assert_eq!((report.n_train, report.n_test), (48, 12));
    assert!(report.cv_mean() > 0.8);
    assert!(report.train_score > 0.9);
    assert!(report.test_score > 0.8);

    assert!(dir.path().join("pipeline_s1_t2.json").exists());
    assert!(dir.path().join("test_data_s1_t2.npz").exists());
    assert!(registry.status(key(1, 2)).unwrap().is_ready());

    // A fresh evaluator sees exactly what training scored on the test part
    let evaluation = Evaluator::new(FsArtifactRegistry::new(dir.path())).evaluate(key(1, 2)).unwrap();
    assert_eq!(evaluation.predictions.len(), 12);
    assert!((evaluation.accuracy() - report.test_score).abs() < 1e-12);
    for (index, prediction) in evaluation.predictions.iter().enumerate() {
        assert_eq!(prediction.index, index);
        assert_eq!(prediction.correct, prediction.predicted == prediction.expected);
    }
}

#[test]
fn test_retraining_replaces_artifacts() {
    let registry = MemoryArtifactRegistry::new();
    let trainer = Trainer::new(SyntheticSource::new(&[2]), registry.clone(), ExperimentConfig::default());

    trainer.train(SubjectId::new(2).unwrap(), TaskId::new(1)).unwrap();
    let first = Evaluator::new(registry.clone()).evaluate(key(2, 1)).unwrap();

    trainer.train(SubjectId::new(2).unwrap(), TaskId::new(1)).unwrap();
    let second = Evaluator::new(registry.clone()).evaluate(key(2, 1)).unwrap();

    // Same seed, same data: identical outcome
    assert_eq!(first.predictions, second.predictions);
    assert_eq!(registry.len().unwrap(), 1);
}

#[test]
fn test_untrained_pair_is_distinguishable() {
    let evaluator = Evaluator::new(MemoryArtifactRegistry::new());
    let err = evaluator.evaluate(key(9, 3)).unwrap_err();
    assert!(err.is_not_trained());
    assert!(err.to_string().contains("not trained"));
}

#[test]
fn test_unknown_task_error_comes_from_source() {
    let registry = MemoryArtifactRegistry::new();
    let trainer = Trainer::new(SyntheticSource::new(&[1]), registry.clone(), ExperimentConfig::default());
    let err = trainer.train(SubjectId::new(1).unwrap(), TaskId::new(5)).unwrap_err();
    assert!(matches!(err, WorkflowError::Dataset(DatasetError::Validation(_))));
    assert!(err.to_string().contains("Expected task to be 1..=4, but got 5."));
    assert_eq!(registry.status(key(1, 5)).unwrap(), ArtifactStatus::Missing);
}

#[test]
fn test_batch_training_and_accuracy_sweep() {
    let registry = MemoryArtifactRegistry::new();
    let catalog = TaskCatalog::default();
    let subjects = || [1, 2, 3].map(|s| SubjectId::new(s).unwrap());

    // Subject 3 has no recordings: its four runs fail and are skipped
    let trainer = Trainer::new(SyntheticSource::new(&[1, 2]), registry.clone(), ExperimentConfig::default());
    let mut seen = 0;
    let trained = train_all(&trainer, subjects(), &catalog, |_| seen += 1);
    assert_eq!(trained.reports.len(), 8);
    assert_eq!(trained.failed.len(), 4);
    assert_eq!(seen, 8);

    // Partial entries count as untrained too
    registry.discard_test_split(key(2, 4)).unwrap();
    assert_eq!(registry.status(key(2, 4)).unwrap(), ArtifactStatus::Partial);

    let summary = accuracy_sweep(&Evaluator::new(registry), subjects(), &catalog);
    assert_eq!(summary.entries.len(), 7);
    assert_eq!(summary.skipped.len(), 5);
    assert!(summary.failed.is_empty());
    assert!(summary.skipped.contains(&key(2, 4)));

    let task_means = summary.task_means();
    assert_eq!(task_means.len(), 4);
    assert!(task_means.iter().all(|(_, mean)| (0.0..=1.0).contains(mean)));
    assert!(summary.overall_mean().unwrap() > 0.7);
}

#[test]
fn test_sweep_continues_past_corrupt_envelope() {
    let dir = TempDir::new().unwrap();
    let registry = FsArtifactRegistry::new(dir.path());
    let catalog = TaskCatalog::default();
    let subjects = || [1, 2].map(|s| SubjectId::new(s).unwrap());

    let trainer = Trainer::new(SyntheticSource::new(&[1, 2]), registry.clone(), ExperimentConfig::default());
    let trained = train_all(&trainer, subjects(), &catalog, |_| {});
    assert_eq!(trained.reports.len(), 8);

    std::fs::write(registry.pipeline_path(key(1, 1)), "{ not json").unwrap();

    let summary = accuracy_sweep(&Evaluator::new(registry), subjects(), &catalog);
    assert_eq!(summary.failed, vec![key(1, 1)]);
    assert_eq!(summary.entries.len(), 7);
    assert!(summary.skipped.is_empty());
    assert!(summary.entries.iter().all(|(k, _)| *k != key(1, 1)));
}
