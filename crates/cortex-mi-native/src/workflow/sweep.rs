//! Batch runs over every (subject, task) pair

use serde::Serialize;
use tracing::{error, info, warn};

use cortex_mi_core::{ArtifactKey, SubjectId, TaskCatalog, TaskId};

use crate::artifacts::ArtifactRegistry;
use crate::dataset::loader::EpochSource;
use crate::workflow::evaluate::Evaluator;
use crate::workflow::train::{Trainer, TrainingReport};

/// Accuracy of every evaluated pair with per-task and overall means.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AccuracySummary {
    /// Evaluated pairs in sweep order
    pub entries: Vec<(ArtifactKey, f64)>,
    /// Pairs without a trained model
    pub skipped: Vec<ArtifactKey>,
    /// Pairs whose stored model could not be evaluated
    pub failed: Vec<ArtifactKey>,
}

impl AccuracySummary {
    /// Mean accuracy of each task that has at least one entry, in task order
    #[must_use]
    pub fn task_means(&self) -> Vec<(TaskId, f64)> {
        let mut tasks: Vec<TaskId> = self.entries.iter().map(|(key, _)| key.task).collect();
        tasks.sort_unstable();
        tasks.dedup();

        tasks
            .into_iter()
            .filter_map(|task| {
                mean(self.entries.iter().filter(|(key, _)| key.task == task).map(|(_, acc)| *acc))
                    .map(|m| (task, m))
            })
            .collect()
    }

    /// Mean over all entries; `None` when nothing was evaluated
    #[must_use]
    pub fn overall_mean(&self) -> Option<f64> {
        mean(self.entries.iter().map(|(_, acc)| *acc))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Evaluate every subject on every catalog task.
///
/// Untrained pairs are skipped; pairs whose evaluation fails are logged and
/// collected in [`AccuracySummary::failed`].
pub fn accuracy_sweep<R, I>(evaluator: &Evaluator<R>, subjects: I, catalog: &TaskCatalog) -> AccuracySummary
where
    R: ArtifactRegistry,
    I: IntoIterator<Item = SubjectId>,
{
    let mut summary = AccuracySummary::default();

    for subject in subjects {
        for task in catalog.ids() {
            let key = ArtifactKey::new(subject, task);
            match evaluator.evaluate(key) {
                Ok(report) => summary.entries.push((key, report.accuracy())),
                Err(e) if e.is_not_trained() => {
                    warn!(%key, "Model not trained, skipping");
                    summary.skipped.push(key);
                }
                Err(e) => {
                    error!(%key, error = %e, "Evaluation failed, skipping");
                    summary.failed.push(key);
                }
            }
        }
    }

    info!(
        evaluated = summary.entries.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        overall = ?summary.overall_mean(),
        "Accuracy sweep complete"
    );
    summary
}

/// Outcome of [`train_all`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrainAllSummary {
    /// Reports of successful runs
    pub reports: Vec<TrainingReport>,
    /// Pairs whose training failed
    pub failed: Vec<ArtifactKey>,
}

/// Train every subject on every catalog task, logging and skipping failures.
///
/// `on_report` sees each successful report as it completes.
pub fn train_all<S, R, I>(
    trainer: &Trainer<S, R>,
    subjects: I,
    catalog: &TaskCatalog,
    mut on_report: impl FnMut(&TrainingReport),
) -> TrainAllSummary
where
    S: EpochSource,
    R: ArtifactRegistry,
    I: IntoIterator<Item = SubjectId>,
{
    let mut summary = TrainAllSummary::default();

    for subject in subjects {
        for task in catalog.ids() {
            match trainer.train(subject, task) {
                Ok(report) => {
                    on_report(&report);
                    summary.reports.push(report);
                }
                Err(e) => {
                    let key = ArtifactKey::new(subject, task);
                    error!(%key, error = %e, "Training failed, skipping");
                    summary.failed.push(key);
                }
            }
        }
    }

    info!(
        trained = summary.reports.len(),
        failed = summary.failed.len(),
        "Batch training complete"
    );
    summary
}
