//! Pseudometric pathwise-L2 discrepancy.
//!
//! Both paths are treated as piecewise-linear interpolants over the shared
//! time axis, and the discrepancy is the exact definite integral
//!
//! `∫ ‖W·(path1(t) − path2(t))‖² dt`
//!
//! with `W` an optional learned linear reprojection. The difference of two
//! linear interpolants is itself piecewise-linear, so the squared norm is
//! piecewise-quadratic and each segment integrates in closed form:
//!
//! `∫_seg = Δt/3 · Σ_c (a_c² + a_c·b_c + b_c²)`
//!
//! where `a = W·d_k` and `b = W·d_{k+1}` are the reprojected endpoint
//! differences. Analytic integration keeps the reverse-mode gradients exact;
//! no numeric quadrature is involved anywhere.
//!
//! The Cartesian pair loop is the hot path. Each pair is evaluated with a
//! fused loop over segments holding only `O(C)` state, so the
//! `O(B1·B2·L·C)` difference tensor is never materialized.

use crate::core::discrepancy::{Discrepancy, Gradients};
use crate::core::error::{DiscrepancyError, Result};
use crate::core::linear::LinearMap;
use crate::core::path::PathBatch;
use crate::core::tensor::Tensor;
use crate::kernels::broadcast::{check_pair, result_shape};

/// Minimum number of (path1, path2) pairs before dispatching to the parallel
/// kernel. Below this, thread-dispatch overhead exceeds parallelism gains.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_PAIRS: usize = 64;

/// Pathwise-L2 discrepancy module with an optional learned pseudometric.
///
/// With pseudometric mode on (the default), owns a Kaiming-initialized
/// `[C, C]` linear map applied to channel differences before norming. With it
/// off, the raw difference is used and the discrepancy is exactly symmetric.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct L2Discrepancy {
    in_channels: usize,
    linear: Option<LinearMap>,
}

impl L2Discrepancy {
    /// Pseudometric mode: learnable Kaiming-uniform linear reprojection.
    pub fn new(in_channels: usize) -> Self {
        Self {
            in_channels,
            linear: Some(LinearMap::kaiming_uniform(in_channels)),
        }
    }

    /// Plain L2 mode: no learnable parameter, symmetric distance.
    pub fn without_pseudometric(in_channels: usize) -> Self {
        Self {
            in_channels,
            linear: None,
        }
    }

    /// Pseudometric mode with explicit weights (deterministic; used by tests
    /// and checkpoint restore).
    pub fn with_linear(linear: LinearMap) -> Self {
        Self {
            in_channels: linear.dim(),
            linear: Some(linear),
        }
    }

    /// The learned linear map, if pseudometric mode is on.
    pub fn linear(&self) -> Option<&LinearMap> {
        self.linear.as_ref()
    }

    /// Mutable access for the external optimizer.
    pub fn linear_mut(&mut self) -> Option<&mut LinearMap> {
        self.linear.as_mut()
    }
}

/// Saved forward state for the backward pass.
///
/// The per-pair projected differences are cheap to recompute, so the tape
/// stores only the inputs rather than `O(B1·B2·L·C)` activations.
#[derive(Debug, Clone)]
pub struct L2Tape {
    times: Vec<f64>,
    path1: PathBatch,
    path2: PathBatch,
}

impl Discrepancy for L2Discrepancy {
    type Tape = L2Tape;

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn evaluate(&self, times: &[f64], path1: &PathBatch, path2: &PathBatch) -> Result<Tensor> {
        l2_discrepancy(times, path1, path2, self.linear.as_ref())
    }

    fn evaluate_traced(
        &self,
        times: &[f64],
        path1: &PathBatch,
        path2: &PathBatch,
    ) -> Result<(Tensor, L2Tape)> {
        let out = self.evaluate(times, path1, path2)?;
        let tape = L2Tape {
            times: times.to_vec(),
            path1: path1.clone(),
            path2: path2.clone(),
        };
        Ok((out, tape))
    }

    fn backward(&self, tape: &L2Tape, grad_output: &Tensor) -> Result<Gradients> {
        l2_discrepancy_backward(
            &tape.times,
            &tape.path1,
            &tape.path2,
            self.linear.as_ref(),
            grad_output,
        )
    }
}

fn check_linear(linear: Option<&LinearMap>, channels: usize) -> Result<()> {
    if let Some(w) = linear {
        if w.dim() != channels {
            return Err(DiscrepancyError::ShapeMismatch {
                expected: format!("linear map of dim {channels}"),
                actual: format!("linear map of dim {}", w.dim()),
            });
        }
    }
    Ok(())
}

/// Endpoint difference at sample `k`, optionally reprojected through `W`.
#[inline]
fn project_diff(
    x1: &[f64],
    x2: &[f64],
    k: usize,
    c: usize,
    linear: Option<&LinearMap>,
    diff: &mut [f64],
    out: &mut [f64],
) {
    let base = k * c;
    match linear {
        Some(w) => {
            for ch in 0..c {
                diff[ch] = x1[base + ch] - x2[base + ch];
            }
            w.apply(diff, out);
        }
        None => {
            for ch in 0..c {
                out[ch] = x1[base + ch] - x2[base + ch];
            }
        }
    }
}

/// Fused single-pair integral. `a`/`b`/`d` are caller-owned `C`-length
/// scratch buffers so the pair loop allocates nothing.
fn pair_forward(
    times: &[f64],
    x1: &[f64],
    x2: &[f64],
    c: usize,
    linear: Option<&LinearMap>,
    a: &mut Vec<f64>,
    b: &mut Vec<f64>,
    d: &mut Vec<f64>,
) -> f64 {
    let l = times.len();
    project_diff(x1, x2, 0, c, linear, d, a);

    let mut acc = 0.0;
    for k in 0..l - 1 {
        project_diff(x1, x2, k + 1, c, linear, d, b);
        let mut seg = 0.0;
        for ch in 0..c {
            let av = a[ch];
            let bv = b[ch];
            seg = av.mul_add(av, seg);
            seg = av.mul_add(bv, seg);
            seg = bv.mul_add(bv, seg);
        }
        let dt = times[k + 1] - times[k];
        acc = (dt / 3.0).mul_add(seg, acc);
        std::mem::swap(a, b);
    }
    acc
}

/// Evaluate the pathwise-L2 discrepancy over the Cartesian product of the two
/// batches.
///
/// Result shape is `path1.batch_shape() ++ path2.batch_shape()` with the
/// path2 index fastest-varying. Dispatches to a rayon-parallel pair loop
/// above [`MIN_PARALLEL_PAIRS`].
pub fn l2_discrepancy(
    times: &[f64],
    path1: &PathBatch,
    path2: &PathBatch,
    linear: Option<&LinearMap>,
) -> Result<Tensor> {
    let c = path1.channels();
    check_pair(times, path1, path2, c)?;
    check_linear(linear, c)?;

    let b1 = path1.batch_size();
    let b2 = path2.batch_size();
    let shape = result_shape(path1.batch_shape(), path2.batch_shape());
    let mut out = vec![0.0; b1 * b2];
    if out.is_empty() {
        return Tensor::new(out, shape);
    }

    let serial = |out: &mut [f64]| {
        let mut a = vec![0.0; c];
        let mut b = vec![0.0; c];
        let mut d = vec![0.0; c];
        for i in 0..b1 {
            let x1 = path1.path(i);
            for (j, slot) in out[i * b2..(i + 1) * b2].iter_mut().enumerate() {
                *slot = pair_forward(times, x1, path2.path(j), c, linear, &mut a, &mut b, &mut d);
            }
        }
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if b1 * b2 >= MIN_PARALLEL_PAIRS {
            out.par_chunks_mut(b2).enumerate().for_each(|(i, row)| {
                let mut a = vec![0.0; c];
                let mut b = vec![0.0; c];
                let mut d = vec![0.0; c];
                let x1 = path1.path(i);
                for (j, slot) in row.iter_mut().enumerate() {
                    *slot =
                        pair_forward(times, x1, path2.path(j), c, linear, &mut a, &mut b, &mut d);
                }
            });
        } else {
            serial(&mut out);
        }
    }
    #[cfg(not(feature = "parallel"))]
    serial(&mut out);

    Tensor::new(out, shape)
}

/// Thread-local accumulator for the backward pass; merged once per thread,
/// so the hot loop writes without synchronization.
struct GradAcc {
    gx1: Vec<f64>,
    gx2: Vec<f64>,
    glin: Option<LinearMap>,
}

impl GradAcc {
    fn new(n1: usize, n2: usize, linear: Option<&LinearMap>) -> Self {
        Self {
            gx1: vec![0.0; n1],
            gx2: vec![0.0; n2],
            glin: linear.map(|w| LinearMap::zeros(w.dim())),
        }
    }

    fn merge(&mut self, other: &GradAcc) {
        for (a, b) in self.gx1.iter_mut().zip(&other.gx1) {
            *a += b;
        }
        for (a, b) in self.gx2.iter_mut().zip(&other.gx2) {
            *a += b;
        }
        if let (Some(gl), Some(ol)) = (self.glin.as_mut(), other.glin.as_ref()) {
            gl.add_scaled(ol, 1.0);
        }
    }
}

/// Per-pair scratch for the backward kernel.
struct BackwardScratch {
    /// Projected endpoint differences at every sample, `L * C`.
    md: Vec<f64>,
    g: Vec<f64>,
    gt: Vec<f64>,
    d: Vec<f64>,
}

impl BackwardScratch {
    fn new(l: usize, c: usize) -> Self {
        Self {
            md: vec![0.0; l * c],
            g: vec![0.0; c],
            gt: vec![0.0; c],
            d: vec![0.0; c],
        }
    }
}

/// Single-pair reverse pass.
///
/// With `a_k = W·d_k` the segment integral gives
/// `dI/da_j = Δt_{j−1}/3·(a_{j−1} + 2a_j) + Δt_j/3·(2a_j + a_{j+1})`
/// (boundary terms dropped), and the chain rule routes `Wᵀ` back to the
/// paths and the outer product `g_j·d_jᵀ` into the weight gradient.
#[allow(clippy::too_many_arguments)]
fn pair_backward(
    times: &[f64],
    x1: &[f64],
    x2: &[f64],
    c: usize,
    linear: Option<&LinearMap>,
    w_out: f64,
    s: &mut BackwardScratch,
    gx1: &mut [f64],
    gx2: &mut [f64],
    glin: &mut Option<LinearMap>,
) {
    let l = times.len();
    for k in 0..l {
        project_diff(x1, x2, k, c, linear, &mut s.d, &mut s.md[k * c..(k + 1) * c]);
    }

    for j in 0..l {
        s.g.fill(0.0);
        if j > 0 {
            let sc = (times[j] - times[j - 1]) / 3.0;
            for ch in 0..c {
                s.g[ch] += sc * (s.md[(j - 1) * c + ch] + 2.0 * s.md[j * c + ch]);
            }
        }
        if j + 1 < l {
            let sc = (times[j + 1] - times[j]) / 3.0;
            for ch in 0..c {
                s.g[ch] += sc * (2.0 * s.md[j * c + ch] + s.md[(j + 1) * c + ch]);
            }
        }
        for ch in 0..c {
            s.g[ch] *= w_out;
        }

        match (linear, glin.as_mut()) {
            (Some(wm), Some(gl)) => {
                wm.apply_transpose(&s.g, &mut s.gt);
                for ch in 0..c {
                    gx1[j * c + ch] += s.gt[ch];
                    gx2[j * c + ch] -= s.gt[ch];
                }
                for ch in 0..c {
                    s.d[ch] = x1[j * c + ch] - x2[j * c + ch];
                }
                gl.accumulate_outer(&s.g, &s.d, 1.0);
            }
            _ => {
                for ch in 0..c {
                    gx1[j * c + ch] += s.g[ch];
                    gx2[j * c + ch] -= s.g[ch];
                }
            }
        }
    }
}

/// Reverse-mode pass for [`l2_discrepancy`].
///
/// `grad_output` must carry the forward result's shape. Returns gradients for
/// both paths (same shapes as the inputs) and, when a linear map was
/// supplied, for its weights.
pub fn l2_discrepancy_backward(
    times: &[f64],
    path1: &PathBatch,
    path2: &PathBatch,
    linear: Option<&LinearMap>,
    grad_output: &Tensor,
) -> Result<Gradients> {
    let c = path1.channels();
    check_pair(times, path1, path2, c)?;
    check_linear(linear, c)?;

    let b1 = path1.batch_size();
    let b2 = path2.batch_size();
    let expected_shape = result_shape(path1.batch_shape(), path2.batch_shape());
    if grad_output.shape != expected_shape {
        return Err(DiscrepancyError::ShapeMismatch {
            expected: format!("grad_output of shape {expected_shape:?}"),
            actual: format!("shape {:?}", grad_output.shape),
        });
    }

    let l = times.len();
    let stride = l * c;

    let run_range = |range: (usize, usize), acc: &mut GradAcc| {
        let mut scratch = BackwardScratch::new(l, c);
        for i in range.0..range.1 {
            let x1 = path1.path(i);
            let gx1 = &mut acc.gx1[i * stride..(i + 1) * stride];
            for j in 0..b2 {
                let w_out = grad_output.data[i * b2 + j];
                if w_out == 0.0 {
                    continue;
                }
                pair_backward(
                    times,
                    x1,
                    path2.path(j),
                    c,
                    linear,
                    w_out,
                    &mut scratch,
                    gx1,
                    &mut acc.gx2[j * stride..(j + 1) * stride],
                    &mut acc.glin,
                );
            }
        }
    };

    let mut total = GradAcc::new(b1 * stride, b2 * stride, linear);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        use crate::kernels::broadcast::chunk_ranges;

        if b1 * b2 >= MIN_PARALLEL_PAIRS {
            let ranges = chunk_ranges(b1, rayon::current_num_threads());
            let locals: Vec<GradAcc> = ranges
                .into_par_iter()
                .map(|range| {
                    let mut acc = GradAcc::new(b1 * stride, b2 * stride, linear);
                    run_range(range, &mut acc);
                    acc
                })
                .collect();
            for local in &locals {
                total.merge(local);
            }
        } else {
            run_range((0, b1), &mut total);
        }
    }
    #[cfg(not(feature = "parallel"))]
    run_range((0, b1), &mut total);

    let GradAcc { gx1, gx2, glin } = total;
    Ok(Gradients {
        path1: PathBatch::new(
            gx1,
            path1.batch_shape().to_vec(),
            path1.length(),
            path1.channels(),
        )?,
        path2: PathBatch::new(
            gx2,
            path2.batch_shape().to_vec(),
            path2.length(),
            path2.channels(),
        )?,
        linear: glin,
    })
}
