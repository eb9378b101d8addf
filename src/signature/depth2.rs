//! Built-in closed-form logsignature transform for depths 1 and 2.

use crate::core::error::{DiscrepancyError, Result};
use crate::core::path::PathBatch;
use crate::core::tensor::Tensor;
use crate::signature::transform::LogsignatureTransform;

/// Exact logsignature transform for truncation depths 1 and 2.
///
/// Depth 1 features are the path increments `x[L-1] - x[0]` (one per
/// channel). Depth 2 appends the Lévy areas
///
/// `A[i][j] = 1/2 * sum_k (y_k[i] * dy_k[j] - y_k[j] * dy_k[i])`
///
/// over base-pointed coordinates `y_k = x_k - x_0`, for channel pairs
/// `(i, j)` with `i < j` in lexicographic order — the Lyndon basis at this
/// depth. Both levels have hand-written exact backward passes, so gradients
/// through this transform are analytic rather than approximated.
///
/// Depths above 2 require a general free-Lie-algebra implementation and are
/// delegated to external implementations of [`LogsignatureTransform`]; this
/// type reports them as a `Transform` error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Depth2Logsignature;

impl Depth2Logsignature {
    fn check_depth(depth: usize) -> Result<()> {
        if depth < 1 {
            return Err(DiscrepancyError::InvalidDepth { depth });
        }
        if depth > 2 {
            return Err(DiscrepancyError::Transform {
                message: format!(
                    "Depth2Logsignature supports depth <= 2, got {depth}; \
                     use an external transform for higher depths"
                ),
            });
        }
        Ok(())
    }
}

impl LogsignatureTransform for Depth2Logsignature {
    fn forward(&self, path: &PathBatch, depth: usize) -> Result<Tensor> {
        Self::check_depth(depth)?;
        let l = path.length();
        let c = path.channels();
        if l == 0 {
            return Err(DiscrepancyError::Transform {
                message: "cannot take the logsignature of a zero-length path".to_string(),
            });
        }

        let b = path.batch_size();
        let f = self.channels(c, depth);
        let mut out = vec![0.0; b * f];
        let mut y = vec![0.0; l * c];

        for batch in 0..b {
            let x = path.path(batch);
            let features = &mut out[batch * f..(batch + 1) * f];

            // Depth 1: increments
            for ch in 0..c {
                features[ch] = x[(l - 1) * c + ch] - x[ch];
            }

            if depth == 2 {
                // Base-pointed coordinates
                for k in 0..l {
                    for ch in 0..c {
                        y[k * c + ch] = x[k * c + ch] - x[ch];
                    }
                }
                // Lévy areas, pairs (i, j) with i < j
                let mut idx = c;
                for i in 0..c {
                    for j in (i + 1)..c {
                        let mut area = 0.0;
                        for k in 0..l - 1 {
                            let yi = y[k * c + i];
                            let yj = y[k * c + j];
                            let yi1 = y[(k + 1) * c + i];
                            let yj1 = y[(k + 1) * c + j];
                            area += yi * yj1 - yj * yi1;
                        }
                        features[idx] = 0.5 * area;
                        idx += 1;
                    }
                }
            }
        }

        Tensor::new(out, vec![b, f])
    }

    fn backward(
        &self,
        path: &PathBatch,
        depth: usize,
        grad_features: &Tensor,
    ) -> Result<PathBatch> {
        Self::check_depth(depth)?;
        let l = path.length();
        let c = path.channels();
        let b = path.batch_size();
        let f = self.channels(c, depth);

        if grad_features.shape != [b, f] {
            return Err(DiscrepancyError::ShapeMismatch {
                expected: format!("grad features of shape [{b}, {f}]"),
                actual: format!("shape {:?}", grad_features.shape),
            });
        }

        let mut grad = PathBatch::zeros_like(path);
        let mut y = vec![0.0; l * c];
        let mut gy = vec![0.0; l * c];

        for batch in 0..b {
            let x = path.path(batch).to_vec();
            let gf = grad_features.row(batch);
            let gx = grad.path_mut(batch);

            // Depth 1: d(increment)/dx hits only the endpoints
            for ch in 0..c {
                gx[(l - 1) * c + ch] += gf[ch];
                gx[ch] -= gf[ch];
            }

            if depth == 2 && l >= 2 {
                for k in 0..l {
                    for ch in 0..c {
                        y[k * c + ch] = x[k * c + ch] - x[ch];
                    }
                }
                gy.fill(0.0);

                // dA[i][j]/dy[m][i] = 1/2 * (y[m+1][j] - y[m-1][j]),
                // dA[i][j]/dy[m][j] = -1/2 * (y[m+1][i] - y[m-1][i]),
                // missing neighbors dropped at the boundary.
                let mut idx = c;
                for i in 0..c {
                    for j in (i + 1)..c {
                        let g = 0.5 * gf[idx];
                        for m in 0..l {
                            let next_j = if m + 1 < l { y[(m + 1) * c + j] } else { 0.0 };
                            let prev_j = if m > 0 { y[(m - 1) * c + j] } else { 0.0 };
                            let next_i = if m + 1 < l { y[(m + 1) * c + i] } else { 0.0 };
                            let prev_i = if m > 0 { y[(m - 1) * c + i] } else { 0.0 };
                            gy[m * c + i] += g * (next_j - prev_j);
                            gy[m * c + j] -= g * (next_i - prev_i);
                        }
                        idx += 1;
                    }
                }

                // Chain y[m] = x[m] - x[0]
                for m in 0..l {
                    for ch in 0..c {
                        gx[m * c + ch] += gy[m * c + ch];
                    }
                }
                for ch in 0..c {
                    let total: f64 = (0..l).map(|m| gy[m * c + ch]).sum();
                    gx[ch] -= total;
                }
            }
        }

        Ok(grad)
    }
}
