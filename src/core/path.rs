//! Batches of sampled paths and time-axis validation.

use crate::core::error::{DiscrepancyError, Result};

/// A batch of sampled paths stored row-major as `[batch..., length, channels]`.
///
/// All paths in a batch share the same time axis (supplied separately at
/// evaluation time). The leading batch shape is arbitrary, possibly empty
/// (a single path). The trailing two axes are always `(length, channels)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathBatch {
    data: Vec<f64>,
    batch_shape: Vec<usize>,
    length: usize,
    channels: usize,
}

impl PathBatch {
    /// Create a path batch, validating the storage size against the shape.
    pub fn new(
        data: Vec<f64>,
        batch_shape: Vec<usize>,
        length: usize,
        channels: usize,
    ) -> Result<Self> {
        let batch: usize = batch_shape.iter().product();
        let expected = batch * length * channels;
        if data.len() != expected {
            return Err(DiscrepancyError::ShapeMismatch {
                expected: format!(
                    "{expected} elements for shape {batch_shape:?} x [{length}, {channels}]"
                ),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(Self {
            data,
            batch_shape,
            length,
            channels,
        })
    }

    /// A single path (empty batch shape).
    pub fn single(data: Vec<f64>, length: usize, channels: usize) -> Result<Self> {
        Self::new(data, vec![], length, channels)
    }

    /// A zero-filled batch with the same shape as `other`.
    pub fn zeros_like(other: &PathBatch) -> Self {
        Self {
            data: vec![0.0; other.data.len()],
            batch_shape: other.batch_shape.clone(),
            length: other.length,
            channels: other.channels,
        }
    }

    /// Flat row-major storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable flat storage. Used by optimizers updating learnable shapelet
    /// values and by gradient accumulation.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Leading batch dimensions (empty for a single path).
    pub fn batch_shape(&self) -> &[usize] {
        &self.batch_shape
    }

    /// Number of paths in the batch (product of batch dims, 1 if empty).
    pub fn batch_size(&self) -> usize {
        self.batch_shape.iter().product()
    }

    /// Number of sample points per path.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of channels per sample point.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The `b`-th path as a flat `[length * channels]` slice.
    #[inline]
    pub fn path(&self, b: usize) -> &[f64] {
        let stride = self.length * self.channels;
        &self.data[b * stride..(b + 1) * stride]
    }

    /// Mutable view of the `b`-th path.
    #[inline]
    pub fn path_mut(&mut self, b: usize) -> &mut [f64] {
        let stride = self.length * self.channels;
        &mut self.data[b * stride..(b + 1) * stride]
    }

    /// Reinterpret with the batch dims collapsed to a single axis.
    ///
    /// The storage is already row-major, so this is a metadata-only change.
    pub fn flatten_batch(&self) -> PathBatch {
        PathBatch {
            data: self.data.clone(),
            batch_shape: vec![self.batch_size()],
            length: self.length,
            channels: self.channels,
        }
    }
}

/// Validate a shared time axis against a path length.
///
/// Checks the degenerate-path rule (`length >= 2`), the length agreement
/// between `times` and the paths, and strict monotonicity.
pub fn validate_times(times: &[f64], length: usize) -> Result<()> {
    if length < 2 {
        return Err(DiscrepancyError::DegeneratePath { length });
    }
    if times.len() != length {
        return Err(DiscrepancyError::ShapeMismatch {
            expected: format!("times of length {length}"),
            actual: format!("times of length {}", times.len()),
        });
    }
    for i in 0..times.len() - 1 {
        if times[i + 1] <= times[i] {
            return Err(DiscrepancyError::NonIncreasingTimes { index: i });
        }
    }
    Ok(())
}
