//! Error types for discrepancy evaluation.
//!
//! All variants are programmer/configuration errors surfaced synchronously at
//! the call that detects them. There is no retry policy and no partial result.

use std::fmt;

/// Errors raised by discrepancy kernels and the logsignature pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscrepancyError {
    /// Channel, length, or batch-shape incompatibility between
    /// times/path1/path2/linear.
    ShapeMismatch {
        /// Expected shape description
        expected: String,
        /// Actual shape found
        actual: String,
    },

    /// Path too short to form an integral (length < 2).
    DegeneratePath {
        /// Offending path length
        length: usize,
    },

    /// Logsignature truncation depth < 1.
    InvalidDepth {
        /// Offending depth
        depth: usize,
    },

    /// Norm order outside [1, inf].
    InvalidNormOrder {
        /// Offending p
        p: f64,
    },

    /// Time axis not strictly increasing.
    NonIncreasingTimes {
        /// First index where `times[index] >= times[index + 1]`
        index: usize,
    },

    /// Failure propagated from the external logsignature primitive.
    Transform {
        /// Error details
        message: String,
    },
}

impl fmt::Display for DiscrepancyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscrepancyError::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, got {actual}")
            }
            DiscrepancyError::DegeneratePath { length } => {
                write!(
                    f,
                    "degenerate path: length {length} < 2, cannot form an integral"
                )
            }
            DiscrepancyError::InvalidDepth { depth } => {
                write!(f, "invalid logsignature depth {depth}, must be >= 1")
            }
            DiscrepancyError::InvalidNormOrder { p } => {
                write!(f, "invalid norm order p = {p}, must be in [1, inf]")
            }
            DiscrepancyError::NonIncreasingTimes { index } => {
                write!(f, "times must be strictly increasing, violated at index {index}")
            }
            DiscrepancyError::Transform { message } => {
                write!(f, "logsignature transform failed: {message}")
            }
        }
    }
}

impl std::error::Error for DiscrepancyError {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiscrepancyError>;
