//! Training and evaluation workflows
//!
//! - [`train`]: Cross-validate, fit, persist and score one pair
//! - [`evaluate`]: Predict the held-out split of a persisted pipeline
//! - [`sweep`]: Batch training and accuracy over all pairs

pub mod evaluate;
pub mod sweep;
pub mod train;

pub use evaluate::{EpochPrediction, Evaluator, PredictionReport};
pub use sweep::{accuracy_sweep, train_all, AccuracySummary, TrainAllSummary};
pub use train::{Trainer, TrainingReport};
