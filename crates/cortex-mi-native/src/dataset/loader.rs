//! Recording tree access
//!
//! [`EpochSource`] is the seam between workflows and storage: given a subject
//! and task it yields a train/test split of labeled epochs.
//! [`PhysionetLoader`] implements it over a local copy of the PhysioNet
//! EEG Motor Movement/Imagery dataset laid out as
//! `<root>/S001/S001R03.edf`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use cortex_mi_core::{PreprocessConfig, RunId, SplitConfig, SubjectId, TaskCatalog, TaskId};

use crate::dataset::edf::read_edf;
use crate::dataset::epochs::extract_epochs;
use crate::dataset::raw::RawRecording;
use crate::dataset::split::{train_test_split, DatasetSplit};
use crate::error::{DatasetError, DatasetResult};

/// Source of split, labeled epochs for a (subject, task) pair.
pub trait EpochSource {
    /// Load, preprocess, epoch and split the recordings of one pair.
    ///
    /// # Errors
    ///
    /// Returns an error when recordings are missing or unusable.
    fn load_split(&self, subject: SubjectId, task: TaskId) -> DatasetResult<DatasetSplit>;
}

/// Loader over a local PhysioNet motor-imagery tree.
#[derive(Clone, Debug)]
pub struct PhysionetLoader {
    root: PathBuf,
    catalog: TaskCatalog,
    preprocess: PreprocessConfig,
    split: SplitConfig,
}

impl PhysionetLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, catalog: TaskCatalog, preprocess: PreprocessConfig, split: SplitConfig) -> Self {
        Self {
            root: root.into(),
            catalog,
            preprocess,
            split,
        }
    }

    /// Location of one run's EDF file
    #[must_use]
    pub fn run_path(&self, subject: SubjectId, run: RunId) -> PathBuf {
        let dir = format!("S{:03}", subject.get());
        self.root.join(&dir).join(format!("{dir}R{:02}.edf", run.get()))
    }

    /// Root of the recording tree
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the task's runs in catalog order.
    ///
    /// # Errors
    ///
    /// [`DatasetError::MissingRecording`] for an absent run file, or any
    /// EDF error.
    pub fn read_runs(&self, subject: SubjectId, task: TaskId) -> DatasetResult<Vec<RawRecording>> {
        let definition = self.catalog.get(task)?;

        definition
            .runs()
            .iter()
            .map(|&run| {
                let path = self.run_path(subject, run);
                if !path.exists() {
                    return Err(DatasetError::MissingRecording { path });
                }
                debug!(path = %path.display(), "Reading run");
                read_edf(&path)
            })
            .collect()
    }

    /// Read and concatenate the task's runs without filtering.
    ///
    /// # Errors
    ///
    /// Anything [`Self::read_runs`] or concatenation reports.
    pub fn load_raw(&self, subject: SubjectId, task: TaskId) -> DatasetResult<RawRecording> {
        RawRecording::concatenate(self.read_runs(subject, task)?)
    }

    /// Continuous recording after the configured notch and band-pass.
    ///
    /// Each run is filtered on its own before concatenation so the filters
    /// never see the discontinuity between runs.
    pub fn load_filtered(&self, subject: SubjectId, task: TaskId) -> DatasetResult<RawRecording> {
        let mut runs = self.read_runs(subject, task)?;
        for raw in &mut runs {
            if let Some(freq) = self.preprocess.notch_hz {
                raw.notch(freq);
            }
            raw.band_pass(self.preprocess.low_hz, self.preprocess.high_hz);
        }
        RawRecording::concatenate(runs)
    }
}

impl EpochSource for PhysionetLoader {
    fn load_split(&self, subject: SubjectId, task: TaskId) -> DatasetResult<DatasetSplit> {
        self.preprocess.validate()?;

        let raw = self.load_filtered(subject, task)?;
        let epochs = extract_epochs(
            &raw,
            &self.preprocess.event_map,
            self.preprocess.tmin_s,
            self.preprocess.tmax_s,
            self.preprocess.baseline,
        )?;
        let (x, y) = epochs.into_parts();

        let split = train_test_split(x.view(), &y, self.split.test_fraction, self.split.seed)?;
        info!(
            %subject,
            %task,
            train = split.train.len(),
            test = split.test.len(),
            "Dataset loaded"
        );
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::edf::tests::{build_edf, TestSignal};

    fn write_run(root: &Path, subject: u8, run: u8, signal_seed: i16) {
        let dir = root.join(format!("S{subject:03}"));
        std::fs::create_dir_all(&dir).unwrap();

        // 16 Hz, 20 one-second records; events every 4 s
        let samples = |offset: i16| -> Vec<i16> {
            (0..320).map(|k: i16| ((k * 7 + offset) % 41) - 20).collect()
        };
        let bytes = build_edf(
            16,
            20,
            &[
                TestSignal { label: "C3..", unit: "uV", samples: samples(signal_seed) },
                TestSignal { label: "Cz..", unit: "uV", samples: samples(signal_seed + 3) },
                TestSignal { label: "C4..", unit: "uV", samples: samples(signal_seed + 9) },
            ],
            &[(2.0, 4.0, "T0"), (4.0, 4.0, "T1"), (8.0, 4.0, "T2"), (12.0, 4.0, "T1"), (16.0, 4.0, "T2")],
        );
        std::fs::write(dir.join(format!("S{subject:03}R{run:02}.edf")), bytes).unwrap();
    }

    fn loader(root: &Path) -> PhysionetLoader {
        let preprocess = PreprocessConfig {
            low_hz: 2.0,
            high_hz: 6.0,
            tmin_s: -0.5,
            tmax_s: 2.0,
            ..PreprocessConfig::default()
        };
        PhysionetLoader::new(root, TaskCatalog::default(), preprocess, SplitConfig::default())
    }

    #[test]
    fn test_run_path_layout() {
        let loader = loader(Path::new("/data"));
        let path = loader.run_path(SubjectId::new(7).unwrap(), RunId::new(3).unwrap());
        assert_eq!(path, Path::new("/data/S007/S007R03.edf"));
    }

    #[test]
    fn test_missing_recording() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path())
            .load_split(SubjectId::new(1).unwrap(), TaskId::new(1))
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingRecording { .. }));
    }

    #[test]
    fn test_load_split_from_edf_tree() {
        let dir = tempfile::tempdir().unwrap();
        for (run, seed) in [(3, 0), (7, 5), (11, 13)] {
            write_run(dir.path(), 1, run, seed);
        }

        let loader = loader(dir.path());
        let raw = loader.load_raw(SubjectId::new(1).unwrap(), TaskId::new(1)).unwrap();
        assert_eq!(raw.n_samples(), 3 * 320);
        assert_eq!(raw.channel_names(), &["C3".to_string(), "Cz".to_string(), "C4".to_string()]);
        assert_eq!(raw.annotations().len(), 15);

        let split = loader.load_split(SubjectId::new(1).unwrap(), TaskId::new(1)).unwrap();
        // 4 mapped events per run, all inside the recording
        assert_eq!(split.train.len() + split.test.len(), 12);
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.x.dim(), (9, 3, 41));
    }

    #[test]
    fn test_runs_filtered_before_concatenation() {
        let dir = tempfile::tempdir().unwrap();
        for (run, seed) in [(3, 0), (7, 5), (11, 13)] {
            write_run(dir.path(), 1, run, seed);
        }
        let loader = loader(dir.path());
        let (subject, task) = (SubjectId::new(1).unwrap(), TaskId::new(1));

        let filtered = loader.load_filtered(subject, task).unwrap();

        let mut runs = loader.read_runs(subject, task).unwrap();
        assert_eq!(runs.len(), 3);
        for raw in &mut runs {
            raw.band_pass(2.0, 6.0);
        }
        let expected = RawRecording::concatenate(runs).unwrap();

        assert_eq!(filtered.data().dim(), expected.data().dim());
        for (a, b) in filtered.data().iter().zip(expected.data().iter()) {
            assert!((a - b).abs() < 1e-15);
        }

        // Filtering across the joins gives a different signal at the boundary
        let mut joined = loader.load_raw(subject, task).unwrap();
        joined.band_pass(2.0, 6.0);
        let boundary = 320;
        let diff = (boundary - 8..boundary + 8)
            .map(|k| (joined.data()[[0, k]] - filtered.data()[[0, k]]).abs())
            .fold(0.0, f64::max);
        assert!(diff > 0.0);
    }

    #[test]
    fn test_unknown_task_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path())
            .load_split(SubjectId::new(1).unwrap(), TaskId::new(9))
            .unwrap_err();
        assert!(matches!(err, DatasetError::Validation(_)));
    }
}
