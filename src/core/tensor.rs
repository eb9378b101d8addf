//! Plain row-major tensor used for distance outputs, feature vectors, and
//! upstream gradients.

use crate::core::error::{DiscrepancyError, Result};

/// A dense row-major tensor of `f64` values.
///
/// Deliberately minimal: discrepancy results and logsignature features only
/// need shaped storage, not a full linear-algebra type. An empty `shape`
/// denotes a scalar (one element).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Flat row-major storage.
    pub data: Vec<f64>,
    /// Logical dimensions. Empty for a scalar.
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor, validating that the data length matches the shape.
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(DiscrepancyError::ShapeMismatch {
                expected: format!("{expected} elements for shape {shape:?}"),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(Self { data, shape })
    }

    /// Create a zero-filled tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape,
        }
    }

    /// Create a one-filled tensor of the given shape.
    pub fn ones(shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        Self {
            data: vec![1.0; len],
            shape,
        }
    }

    /// Create a scalar (empty-shape) tensor.
    pub fn scalar(value: f64) -> Self {
        Self {
            data: vec![value],
            shape: vec![],
        }
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Extract the value of a scalar or single-element tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor has more than one element.
    pub fn item(&self) -> f64 {
        assert_eq!(
            self.numel(),
            1,
            "item() requires exactly 1 element, got {}",
            self.numel()
        );
        self.data[0]
    }

    /// Row `i` of a 2-d tensor, as a slice of the trailing axis.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2-d or `i` is out of bounds.
    pub fn row(&self, i: usize) -> &[f64] {
        assert_eq!(self.shape.len(), 2, "row() requires a 2-d tensor");
        let cols = self.shape[1];
        &self.data[i * cols..(i + 1) * cols]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(Tensor::new(vec![1.0, 2.0, 3.0], vec![3]).is_ok());
        assert!(matches!(
            Tensor::new(vec![1.0, 2.0], vec![3]),
            Err(DiscrepancyError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_has_empty_shape() {
        let t = Tensor::scalar(2.5);
        assert_eq!(t.shape, Vec::<usize>::new());
        assert_eq!(t.numel(), 1);
        assert!((t.item() - 2.5).abs() < 1e-15);
    }

    #[test]
    fn test_row() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        assert_eq!(t.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(t.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zeros_ones() {
        let z = Tensor::zeros(vec![2, 2]);
        assert!(z.data.iter().all(|&x| x == 0.0));
        let o = Tensor::ones(vec![3]);
        assert!(o.data.iter().all(|&x| x == 1.0));
    }
}
