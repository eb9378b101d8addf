//! Learnable linear reprojection parameter for pseudometric discrepancies.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{DiscrepancyError, Result};

/// A learnable square matrix `W` of shape `[dim, dim]`, applied as `y = W x`.
///
/// Owned by the discrepancy module instance and persisted with the model's
/// parameter set; mutated only by an external optimizer between
/// forward/backward cycles. Also doubles as the gradient accumulator for
/// `dL/dW` in the backward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearMap {
    dim: usize,
    /// Row-major `[dim, dim]` weights.
    weight: Vec<f64>,
}

impl LinearMap {
    /// Kaiming-uniform initialization with `a = sqrt(5)`, i.e. samples from
    /// `U(-1/sqrt(dim), 1/sqrt(dim))`.
    pub fn kaiming_uniform(dim: usize) -> Self {
        let bound = 1.0 / (dim as f64).sqrt();
        let mut rng = rand::thread_rng();
        let weight = (0..dim * dim)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        Self { dim, weight }
    }

    /// The identity map (pseudometric disabled degenerates to this).
    pub fn identity(dim: usize) -> Self {
        let mut weight = vec![0.0; dim * dim];
        for i in 0..dim {
            weight[i * dim + i] = 1.0;
        }
        Self { dim, weight }
    }

    /// All-zero matrix, used as a gradient accumulator.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            weight: vec![0.0; dim * dim],
        }
    }

    /// Create from explicit row-major weights.
    pub fn from_weight(dim: usize, weight: Vec<f64>) -> Result<Self> {
        if weight.len() != dim * dim {
            return Err(DiscrepancyError::ShapeMismatch {
                expected: format!("{} weights for a [{dim}, {dim}] map", dim * dim),
                actual: format!("{} weights", weight.len()),
            });
        }
        Ok(Self { dim, weight })
    }

    /// Square dimension of the map.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row-major weight storage.
    pub fn weight(&self) -> &[f64] {
        &self.weight
    }

    /// Mutable weights, for the external optimizer.
    pub fn weight_mut(&mut self) -> &mut [f64] {
        &mut self.weight
    }

    /// `out = W x`.
    #[inline]
    pub fn apply(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.dim);
        debug_assert_eq!(out.len(), self.dim);
        for (r, o) in out.iter_mut().enumerate() {
            let row = &self.weight[r * self.dim..(r + 1) * self.dim];
            *o = row.iter().zip(x).map(|(w, v)| w * v).sum();
        }
    }

    /// `out = W^T g` (the input-side vector-Jacobian product of `apply`).
    #[inline]
    pub fn apply_transpose(&self, g: &[f64], out: &mut [f64]) {
        debug_assert_eq!(g.len(), self.dim);
        debug_assert_eq!(out.len(), self.dim);
        out.fill(0.0);
        for (r, &gr) in g.iter().enumerate() {
            let row = &self.weight[r * self.dim..(r + 1) * self.dim];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += w * gr;
            }
        }
    }

    /// `W += scale * g x^T` (the weight-side vector-Jacobian product).
    #[inline]
    pub fn accumulate_outer(&mut self, g: &[f64], x: &[f64], scale: f64) {
        debug_assert_eq!(g.len(), self.dim);
        debug_assert_eq!(x.len(), self.dim);
        for (r, &gr) in g.iter().enumerate() {
            let row = &mut self.weight[r * self.dim..(r + 1) * self.dim];
            let s = scale * gr;
            for (w, &xv) in row.iter_mut().zip(x) {
                *w += s * xv;
            }
        }
    }

    /// `W += scale * other`. Used to merge thread-local gradient accumulators
    /// and for plain gradient-descent steps.
    pub fn add_scaled(&mut self, other: &LinearMap, scale: f64) {
        debug_assert_eq!(self.dim, other.dim);
        for (w, &o) in self.weight.iter_mut().zip(&other.weight) {
            *w += scale * o;
        }
    }
}
