//! Dataset access and preparation
//!
//! - [`edf`]: EDF+ file reader
//! - [`raw`]: Continuous recordings, concatenation and filtering
//! - [`epochs`]: Event-locked epoch extraction
//! - [`split`]: Seeded train/test split
//! - [`loader`]: The [`EpochSource`] seam and the PhysioNet tree loader

pub mod edf;
pub mod epochs;
pub mod loader;
pub mod raw;
pub mod split;

pub use edf::{read_edf, Annotation};
pub use epochs::{extract_epochs, Epochs};
pub use loader::{EpochSource, PhysionetLoader};
pub use raw::{RawRecording, RecordingSummary};
pub use split::{train_test_split, DatasetSplit, LabeledEpochs};
