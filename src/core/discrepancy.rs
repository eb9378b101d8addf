//! The shared discrepancy contract.

use crate::core::error::Result;
use crate::core::linear::LinearMap;
use crate::core::path::PathBatch;
use crate::core::tensor::Tensor;

/// Gradients of one discrepancy evaluation with respect to its inputs.
///
/// `path1`/`path2` have the same shapes as the corresponding inputs. `linear`
/// is `None` when pseudometric mode is off (no gradient path exists to it).
#[derive(Debug, Clone)]
pub struct Gradients {
    /// Gradient with respect to the first path batch.
    pub path1: PathBatch,
    /// Gradient with respect to the second path batch.
    pub path2: PathBatch,
    /// Gradient with respect to the learned linear map, if one is registered.
    pub linear: Option<LinearMap>,
}

/// A distance-like score between path segments, evaluated over the Cartesian
/// product of two path batches.
///
/// Designed for static polymorphism: callers are generic over
/// `D: Discrepancy`, so variants {L2, logsignature} are tagged types rather
/// than an inheritance hierarchy, and the per-pair inner loop monomorphizes.
///
/// The associated `Tape` holds forward state saved for the backward pass:
/// `evaluate` is the pure forward path, while `evaluate_traced` followed by
/// `backward` realizes reverse-mode differentiation with explicit
/// vector-Jacobian products.
///
/// Output shape law: for `path1` batch shape `S1` and `path2` batch shape
/// `S2`, the result has shape `S1 ++ S2` (outer product, `path2` index
/// fastest-varying) — never elementwise matching.
pub trait Discrepancy {
    /// Saved forward state consumed by `backward`.
    type Tape;

    /// Channel count this discrepancy was constructed for.
    fn in_channels(&self) -> usize;

    /// Evaluate distances over the Cartesian product of the two batches.
    fn evaluate(&self, times: &[f64], path1: &PathBatch, path2: &PathBatch) -> Result<Tensor>;

    /// Evaluate while recording the state needed for `backward`.
    fn evaluate_traced(
        &self,
        times: &[f64],
        path1: &PathBatch,
        path2: &PathBatch,
    ) -> Result<(Tensor, Self::Tape)>;

    /// Reverse-mode pass: given `dL/d(output)`, produce gradients for both
    /// paths and the linear parameter.
    ///
    /// `grad_output` must have the output's shape.
    fn backward(&self, tape: &Self::Tape, grad_output: &Tensor) -> Result<Gradients>;
}
