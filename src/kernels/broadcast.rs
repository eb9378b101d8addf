//! Batching and Cartesian-broadcast bookkeeping shared by both kernels.
//!
//! Both discrepancies realize the outer-product batch contract the same way:
//! flatten each side's batch dims, iterate an explicit two-index Cartesian
//! grid `(b1, b2)` with `b2` fastest-varying, and report the result under the
//! concatenated shape `S1 ++ S2`. Nothing here relies on implicit
//! shape-expansion semantics.

use crate::core::error::{DiscrepancyError, Result};
use crate::core::path::{validate_times, PathBatch};

/// Output shape of a Cartesian-broadcast discrepancy: `S1 ++ S2`.
pub fn result_shape(batch1: &[usize], batch2: &[usize]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(batch1.len() + batch2.len());
    shape.extend_from_slice(batch1);
    shape.extend_from_slice(batch2);
    shape
}

/// Validate a (times, path1, path2) triple against a registered channel count.
///
/// Checks the shared time axis (length agreement, strict monotonicity,
/// degenerate-path rule) and that both paths carry the expected channels.
pub fn check_pair(
    times: &[f64],
    path1: &PathBatch,
    path2: &PathBatch,
    channels: usize,
) -> Result<()> {
    validate_times(times, path1.length())?;
    if path2.length() != path1.length() {
        return Err(DiscrepancyError::ShapeMismatch {
            expected: format!("path2 of length {}", path1.length()),
            actual: format!("path2 of length {}", path2.length()),
        });
    }
    if path1.channels() != channels || path2.channels() != channels {
        return Err(DiscrepancyError::ShapeMismatch {
            expected: format!("{channels} channels on both paths"),
            actual: format!(
                "path1 has {}, path2 has {}",
                path1.channels(),
                path2.channels()
            ),
        });
    }
    Ok(())
}

/// Partition `0..n_items` into at most `n_chunks` contiguous ranges of nearly
/// equal size. Pair work is uniform, so no weighting is needed.
#[cfg(feature = "parallel")]
pub(crate) fn chunk_ranges(n_items: usize, n_chunks: usize) -> Vec<(usize, usize)> {
    if n_items == 0 || n_chunks == 0 {
        return vec![];
    }
    let n_chunks = n_chunks.min(n_items);
    let chunk = n_items.div_ceil(n_chunks);
    (0..n_chunks)
        .map(|c| (c * chunk, ((c + 1) * chunk).min(n_items)))
        .filter(|(s, e)| e > s)
        .collect()
}
