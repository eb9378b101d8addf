//! Contract for the external logsignature primitive.

use crate::core::error::Result;
use crate::core::path::PathBatch;
use crate::core::tensor::Tensor;
use crate::signature::channels::logsignature_channels;

/// A differentiable logsignature transform over a single-batch-axis path
/// tensor.
///
/// The discrepancy pipeline flattens all leading batch dimensions before
/// calling this, so implementations only see `path` batches with a single
/// batch axis (`batch_shape == [B]` or empty). `forward` returns a
/// `[B, logsignature_channels(channels, depth)]` feature tensor; `backward`
/// is its vector-Jacobian product, mapping `dL/d(features)` back to a
/// gradient with the path's shape.
///
/// Failures inside an implementation (unsupported depth, numerical overflow)
/// are reported as `DiscrepancyError::Transform` and propagate unchanged
/// through the discrepancy that invoked it.
pub trait LogsignatureTransform {
    /// Feature dimension produced for `channels` channels at `depth`.
    ///
    /// Implementations must agree with the Lyndon-word count; the learned
    /// linear map's shape is derived from this.
    fn channels(&self, channels: usize, depth: usize) -> usize {
        logsignature_channels(channels, depth)
    }

    /// Compute features of shape `[batch, channels(c, depth)]`.
    fn forward(&self, path: &PathBatch, depth: usize) -> Result<Tensor>;

    /// Map `grad_features` of shape `[batch, channels(c, depth)]` back to a
    /// gradient with `path`'s shape.
    fn backward(
        &self,
        path: &PathBatch,
        depth: usize,
        grad_features: &Tensor,
    ) -> Result<PathBatch>;
}
