//! Signal processing pipelines
//!
//! This module provides the numeric stages of motor-imagery decoding:
//! - [`filters`]: Butterworth band-pass, notch and zero-phase filtering
//! - [`covariance`]: Per-class spatial covariance estimation
//! - [`csp`]: Common Spatial Pattern filters and average-power features

pub mod covariance;
pub mod csp;
pub mod filters;

pub use covariance::{estimate_covariances, ClassCovariances};
pub use csp::CommonSpatialPattern;
pub use filters::{filtfilt_rows, notch_rows, BandpassFilter, Biquad};
