//! Error types for Cortex MI
//!
//! Validation errors are programmer-facing contract violations raised at the
//! boundary of an operation (bad shapes, mismatched lengths, too few classes,
//! identifiers out of range). They are fatal to the call that raised them and
//! are never retried.

use core::fmt;

// ============================================================================
// Input Validation Errors
// ============================================================================

/// Errors raised when inputs violate an operation's contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One axis of an epoch set is empty
    EmptyAxis {
        /// Name of the empty axis ("epochs", "channels", "samples")
        axis: &'static str,
    },
    /// Number of labels differs from number of epochs
    LengthMismatch {
        /// Number of epochs supplied
        epochs: usize,
        /// Number of labels supplied
        labels: usize,
    },
    /// Too few distinct class labels to fit a contrast
    InsufficientClasses {
        /// Distinct labels found
        found: usize,
        /// Distinct labels required
        required: usize,
    },
    /// Epoch channel count differs from the fitted channel count
    ChannelMismatch {
        /// Channel count seen at fit time
        expected: usize,
        /// Channel count supplied
        got: usize,
    },
    /// Feature count differs from the fitted feature count
    FeatureMismatch {
        /// Feature count seen at fit time
        expected: usize,
        /// Feature count supplied
        got: usize,
    },
    /// A value lies outside its permitted range
    OutOfRange {
        /// Name of the offending variable
        variable: &'static str,
        /// Human-readable description of the permitted range
        expected: String,
        /// The value that was supplied
        actual: String,
    },
    /// A configuration parameter is unusable
    InvalidParameter {
        /// Parameter name
        parameter: &'static str,
        /// Why it is unusable
        reason: String,
    },
}

impl ValidationError {
    /// Build an [`ValidationError::OutOfRange`] from displayable parts.
    pub fn out_of_range(
        variable: &'static str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::OutOfRange {
            variable,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAxis { axis } => write!(f, "Epoch set has no {axis}"),
            Self::LengthMismatch { epochs, labels } => {
                write!(f, "Epochs and labels must have the same length ({epochs} epochs, {labels} labels)")
            }
            Self::InsufficientClasses { found, required } => {
                write!(f, "Need at least {required} distinct classes, found {found}")
            }
            Self::ChannelMismatch { expected, got } => {
                write!(f, "Channel count mismatch: fitted on {expected}, got {got}")
            }
            Self::FeatureMismatch { expected, got } => {
                write!(f, "Feature count mismatch: fitted on {expected}, got {got}")
            }
            Self::OutOfRange { variable, expected, actual } => {
                write!(f, "Expected {variable} to be {expected}, but got {actual}.")
            }
            Self::InvalidParameter { parameter, reason } => {
                write!(f, "Invalid parameter {parameter}: {reason}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
