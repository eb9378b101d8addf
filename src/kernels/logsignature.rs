//! Logsignature discrepancy: p-norm distance between logsignature features.
//!
//! Pipeline per evaluation: append the shared time axis as channel 0 of both
//! paths, collapse each side's batch dims to one axis (the transform
//! primitive accepts a single batch axis), run the logsignature transform on
//! each side independently, then realize the Cartesian batch product over the
//! feature vectors: difference, optional learned square linear map, vector
//! p-norm along the feature axis.

use crate::core::discrepancy::{Discrepancy, Gradients};
use crate::core::error::{DiscrepancyError, Result};
use crate::core::linear::LinearMap;
use crate::core::path::PathBatch;
use crate::core::tensor::Tensor;
use crate::kernels::broadcast::{check_pair, result_shape};
use crate::signature::transform::LogsignatureTransform;

/// Minimum number of feature pairs before dispatching to the parallel
/// broadcast loop.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_PAIRS: usize = 64;

/// p-logsignature distance between two path batches.
///
/// With pseudometric mode on (the default), owns a learned
/// `[F, F]` linear map (no bias) over the feature difference, where
/// `F = logsignature_channels(in_channels + 1, depth)` — the `+1` accounts
/// for the appended time channel.
#[derive(Debug, Clone)]
pub struct LogsignatureDiscrepancy<T: LogsignatureTransform> {
    in_channels: usize,
    depth: usize,
    p: f64,
    linear: Option<LinearMap>,
    transform: T,
}

impl<T: LogsignatureTransform> LogsignatureDiscrepancy<T> {
    /// Pseudometric mode with a Kaiming-initialized linear map and `p = 2`.
    pub fn new(transform: T, in_channels: usize, depth: usize) -> Result<Self> {
        if depth < 1 {
            return Err(DiscrepancyError::InvalidDepth { depth });
        }
        let feature_dim = transform.channels(in_channels + 1, depth);
        Ok(Self {
            in_channels,
            depth,
            p: 2.0,
            linear: Some(LinearMap::kaiming_uniform(feature_dim)),
            transform,
        })
    }

    /// Raw feature-difference mode: no learnable parameter.
    pub fn without_pseudometric(transform: T, in_channels: usize, depth: usize) -> Result<Self> {
        let mut this = Self::new(transform, in_channels, depth)?;
        this.linear = None;
        Ok(this)
    }

    /// Set the norm order. `p` must lie in `[1, ∞]`; `∞` gives the
    /// max-absolute-component norm.
    pub fn with_norm_order(mut self, p: f64) -> Result<Self> {
        if p.is_nan() || p < 1.0 {
            return Err(DiscrepancyError::InvalidNormOrder { p });
        }
        self.p = p;
        Ok(self)
    }

    /// Truncation depth of the logsignature transform.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Norm order p.
    pub fn norm_order(&self) -> f64 {
        self.p
    }

    /// Logsignature feature dimension (after time augmentation).
    pub fn feature_channels(&self) -> usize {
        self.transform.channels(self.in_channels + 1, self.depth)
    }

    /// The learned linear map, if pseudometric mode is on.
    pub fn linear(&self) -> Option<&LinearMap> {
        self.linear.as_ref()
    }

    /// Mutable access for the external optimizer.
    pub fn linear_mut(&mut self) -> Option<&mut LinearMap> {
        self.linear.as_mut()
    }

    fn features(&self, augmented: &PathBatch) -> Result<Tensor> {
        let b = augmented.batch_size();
        let f = self.feature_channels();
        let feat = self.transform.forward(augmented, self.depth)?;
        if feat.shape != [b, f] {
            return Err(DiscrepancyError::Transform {
                message: format!(
                    "transform returned shape {:?}, expected [{b}, {f}]",
                    feat.shape
                ),
            });
        }
        Ok(feat)
    }
}

/// Saved forward state for the backward pass.
#[derive(Debug, Clone)]
pub struct LogsignatureTape {
    augmented1: PathBatch,
    augmented2: PathBatch,
    features1: Tensor,
    features2: Tensor,
    batch_shape1: Vec<usize>,
    batch_shape2: Vec<usize>,
    /// Forward norms, reused by the p-norm vector-Jacobian product.
    output: Tensor,
}

impl<T: LogsignatureTransform> Discrepancy for LogsignatureDiscrepancy<T> {
    type Tape = LogsignatureTape;

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn evaluate(&self, times: &[f64], path1: &PathBatch, path2: &PathBatch) -> Result<Tensor> {
        let (out, _tape) = self.evaluate_traced(times, path1, path2)?;
        Ok(out)
    }

    fn evaluate_traced(
        &self,
        times: &[f64],
        path1: &PathBatch,
        path2: &PathBatch,
    ) -> Result<(Tensor, LogsignatureTape)> {
        check_pair(times, path1, path2, self.in_channels)?;

        let augmented1 = append_time_channel(times, path1);
        let augmented2 = append_time_channel(times, path2);
        let features1 = self.features(&augmented1)?;
        let features2 = self.features(&augmented2)?;

        let out = broadcast_norms(
            &features1,
            &features2,
            self.linear.as_ref(),
            self.p,
            result_shape(path1.batch_shape(), path2.batch_shape()),
        )?;

        let tape = LogsignatureTape {
            augmented1,
            augmented2,
            features1,
            features2,
            batch_shape1: path1.batch_shape().to_vec(),
            batch_shape2: path2.batch_shape().to_vec(),
            output: out.clone(),
        };
        Ok((out, tape))
    }

    fn backward(&self, tape: &LogsignatureTape, grad_output: &Tensor) -> Result<Gradients> {
        let expected_shape = result_shape(&tape.batch_shape1, &tape.batch_shape2);
        if grad_output.shape != expected_shape {
            return Err(DiscrepancyError::ShapeMismatch {
                expected: format!("grad_output of shape {expected_shape:?}"),
                actual: format!("shape {:?}", grad_output.shape),
            });
        }

        let f = self.feature_channels();
        let b1 = tape.features1.shape[0];
        let b2 = tape.features2.shape[0];

        let mut grad_feat1 = vec![0.0; b1 * f];
        let mut grad_feat2 = vec![0.0; b2 * f];
        let mut grad_linear = self.linear.as_ref().map(|w| LinearMap::zeros(w.dim()));

        let mut v = vec![0.0; f];
        let mut u = vec![0.0; f];
        let mut gu = vec![0.0; f];
        let mut gv = vec![0.0; f];
        for i in 0..b1 {
            let f1 = tape.features1.row(i);
            for j in 0..b2 {
                let w_out = grad_output.data[i * b2 + j];
                if w_out == 0.0 {
                    continue;
                }
                let f2 = tape.features2.row(j);
                for ch in 0..f {
                    v[ch] = f1[ch] - f2[ch];
                }
                match self.linear.as_ref() {
                    Some(w) => w.apply(&v, &mut u),
                    None => u.copy_from_slice(&v),
                }
                let n = tape.output.data[i * b2 + j];
                norm_backward(&u, n, self.p, &mut gu);
                for g in gu.iter_mut() {
                    *g *= w_out;
                }
                match self.linear.as_ref() {
                    Some(w) => {
                        w.apply_transpose(&gu, &mut gv);
                        if let Some(gl) = grad_linear.as_mut() {
                            gl.accumulate_outer(&gu, &v, 1.0);
                        }
                    }
                    None => gv.copy_from_slice(&gu),
                }
                for ch in 0..f {
                    grad_feat1[i * f + ch] += gv[ch];
                    grad_feat2[j * f + ch] -= gv[ch];
                }
            }
        }

        let grad_aug1 = self.transform.backward(
            &tape.augmented1,
            self.depth,
            &Tensor::new(grad_feat1, vec![b1, f])?,
        )?;
        let grad_aug2 = self.transform.backward(
            &tape.augmented2,
            self.depth,
            &Tensor::new(grad_feat2, vec![b2, f])?,
        )?;

        Ok(Gradients {
            path1: strip_time_channel(&grad_aug1, &tape.batch_shape1)?,
            path2: strip_time_channel(&grad_aug2, &tape.batch_shape2)?,
            linear: grad_linear,
        })
    }
}

/// Prepend the shared time axis as channel 0 of every path in the batch, and
/// collapse the batch dims to a single axis.
fn append_time_channel(times: &[f64], path: &PathBatch) -> PathBatch {
    let b = path.batch_size();
    let l = path.length();
    let c = path.channels();
    let mut data = vec![0.0; b * l * (c + 1)];
    for batch in 0..b {
        let src = path.path(batch);
        let dst = &mut data[batch * l * (c + 1)..(batch + 1) * l * (c + 1)];
        for k in 0..l {
            dst[k * (c + 1)] = times[k];
            dst[k * (c + 1) + 1..(k + 1) * (c + 1)].copy_from_slice(&src[k * c..(k + 1) * c]);
        }
    }
    PathBatch::new(data, vec![b], l, c + 1).expect("augmented storage sized by construction")
}

/// Drop the time channel's gradient and restore the original batch shape.
fn strip_time_channel(grad_augmented: &PathBatch, batch_shape: &[usize]) -> Result<PathBatch> {
    let b = grad_augmented.batch_size();
    let l = grad_augmented.length();
    let c = grad_augmented.channels() - 1;
    let mut data = vec![0.0; b * l * c];
    for batch in 0..b {
        let src = grad_augmented.path(batch);
        let dst = &mut data[batch * l * c..(batch + 1) * l * c];
        for k in 0..l {
            dst[k * c..(k + 1) * c].copy_from_slice(&src[k * (c + 1) + 1..(k + 1) * (c + 1)]);
        }
    }
    PathBatch::new(data, batch_shape.to_vec(), l, c)
}

/// Vector p-norm for `p` in `[1, ∞]`.
fn p_norm(u: &[f64], p: f64) -> f64 {
    if p.is_infinite() {
        u.iter().fold(0.0, |acc, &x| acc.max(x.abs()))
    } else if p == 2.0 {
        u.iter().map(|&x| x * x).sum::<f64>().sqrt()
    } else if p == 1.0 {
        u.iter().map(|&x| x.abs()).sum()
    } else {
        u.iter()
            .map(|&x| x.abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p)
    }
}

/// `d(p_norm)/du`. Zero at the origin; for `p = ∞` the (sub)gradient is
/// routed to the first maximal component.
fn norm_backward(u: &[f64], n: f64, p: f64, out: &mut [f64]) {
    out.fill(0.0);
    if n == 0.0 {
        return;
    }
    if p.is_infinite() {
        let mut best = 0;
        for (i, &x) in u.iter().enumerate() {
            if x.abs() > u[best].abs() {
                best = i;
            }
        }
        out[best] = u[best].signum();
    } else if p == 2.0 {
        for (o, &x) in out.iter_mut().zip(u) {
            *o = x / n;
        }
    } else if p == 1.0 {
        for (o, &x) in out.iter_mut().zip(u) {
            *o = if x == 0.0 { 0.0 } else { x.signum() };
        }
    } else {
        for (o, &x) in out.iter_mut().zip(u) {
            *o = if x == 0.0 {
                0.0
            } else {
                x.signum() * (x.abs() / n).powf(p - 1.0)
            };
        }
    }
}

/// Cartesian broadcast of the two feature batches: difference, optional
/// linear map, p-norm per pair.
fn broadcast_norms(
    features1: &Tensor,
    features2: &Tensor,
    linear: Option<&LinearMap>,
    p: f64,
    shape: Vec<usize>,
) -> Result<Tensor> {
    let b1 = features1.shape[0];
    let b2 = features2.shape[0];
    let f = features1.shape[1];
    let mut out = vec![0.0; b1 * b2];
    if out.is_empty() {
        return Tensor::new(out, shape);
    }

    let pair_row = |i: usize, row: &mut [f64], v: &mut [f64], u: &mut [f64]| {
        let f1 = features1.row(i);
        for (j, slot) in row.iter_mut().enumerate() {
            let f2 = features2.row(j);
            for ch in 0..f {
                v[ch] = f1[ch] - f2[ch];
            }
            *slot = match linear {
                Some(w) => {
                    w.apply(v, u);
                    p_norm(u, p)
                }
                None => p_norm(v, p),
            };
        }
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if b1 * b2 >= MIN_PARALLEL_PAIRS {
            out.par_chunks_mut(b2).enumerate().for_each(|(i, row)| {
                let mut v = vec![0.0; f];
                let mut u = vec![0.0; f];
                pair_row(i, row, &mut v, &mut u);
            });
            return Tensor::new(out, shape);
        }
    }

    let mut v = vec![0.0; f];
    let mut u = vec![0.0; f];
    for i in 0..b1 {
        pair_row(i, &mut out[i * b2..(i + 1) * b2], &mut v, &mut u);
    }
    Tensor::new(out, shape)
}
