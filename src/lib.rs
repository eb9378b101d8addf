//! Differentiable path-discrepancy kernels for shapelet-based time-series
//! classification.
//!
//! A *discrepancy* is a (possibly asymmetric) distance between two path
//! segments, used as the shapelet-to-series comparison metric. Two kernels
//! share one contract ([`Discrepancy`]):
//!
//! - [`L2Discrepancy`] — the exact integral of the squared Euclidean norm of
//!   the difference of two piecewise-linear interpolants, optionally through
//!   a learned linear pseudometric.
//! - [`LogsignatureDiscrepancy`] — the p-norm distance between logsignature
//!   features of time-augmented paths, with the transform itself behind the
//!   [`LogsignatureTransform`] trait.
//!
//! Both broadcast `path1`'s batch dimensions against `path2`'s as a Cartesian
//! product and support reverse-mode gradients to both paths and to the
//! learned parameter via `evaluate_traced` + `backward`.
//!
//! # Examples
//!
//! ```
//! use shapelet_rs::{l2_discrepancy, PathBatch};
//!
//! // Two shapelets against four windows of a series, 2 channels, length 3.
//! let times = [0.0, 0.5, 1.0];
//! let shapelets = PathBatch::new(vec![0.1; 2 * 3 * 2], vec![2], 3, 2).unwrap();
//! let windows = PathBatch::new(vec![0.3; 4 * 3 * 2], vec![4], 3, 2).unwrap();
//!
//! let distances = l2_discrepancy(&times, &shapelets, &windows, None).unwrap();
//! assert_eq!(distances.shape, vec![2, 4]);
//! ```

pub mod core;
pub mod kernels;
pub mod signature;

pub use crate::core::discrepancy::{Discrepancy, Gradients};
pub use crate::core::error::{DiscrepancyError, Result};
pub use crate::core::linear::LinearMap;
pub use crate::core::path::{validate_times, PathBatch};
pub use crate::core::tensor::Tensor;
pub use crate::kernels::l2::{l2_discrepancy, l2_discrepancy_backward, L2Discrepancy, L2Tape};
pub use crate::kernels::logsignature::{LogsignatureDiscrepancy, LogsignatureTape};
pub use crate::signature::channels::logsignature_channels;
pub use crate::signature::depth2::Depth2Logsignature;
pub use crate::signature::transform::LogsignatureTransform;
