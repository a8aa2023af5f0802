//! Dense tensor type for forward computation.
//!
//! Enlace encodes molecules; it does not train them. The tensor here is
//! therefore a plain row-major value type without gradient tracking.

use std::fmt;

/// A dense row-major tensor of `f32` values.
///
/// # Examples
///
/// ```
/// use enlace::tensor::Tensor;
///
/// let t = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(t.shape(), &[2, 2]);
/// assert_eq!(t.numel(), 4);
/// ```
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor from a slice with the given shape.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the product of shape dimensions.
    #[must_use]
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        let expected_len: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_len,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_len
        );

        Self {
            data: data.to_vec(),
            shape: shape.to_vec(),
        }
    }

    /// Create a tensor from a 1D slice (vector).
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self::new(data, &[data.len()])
    }

    /// Create a tensor filled with zeros.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape: shape.to_vec(),
        }
    }

    /// Create a tensor filled with ones.
    #[must_use]
    pub fn ones(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self {
            data: vec![1.0; len],
            shape: shape.to_vec(),
        }
    }

    /// Build a 2D tensor by stacking equal-length rows.
    ///
    /// # Panics
    ///
    /// Panics if rows have differing lengths.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            assert_eq!(
                row.len(),
                n_cols,
                "All rows must have length {}, got {}",
                n_cols,
                row.len()
            );
            data.extend_from_slice(row);
        }
        Self {
            data,
            shape: vec![n_rows, n_cols],
        }
    }

    /// Get the shape of the tensor.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the total number of elements.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Get the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get a reference to the underlying data.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get a mutable reference to the underlying data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Reinterpret the tensor with a new shape of equal element count.
    ///
    /// # Panics
    ///
    /// Panics if the element counts differ.
    #[must_use]
    pub fn view(&self, shape: &[usize]) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            self.numel(),
            expected,
            "Cannot view shape {:?} as {:?}",
            self.shape,
            shape
        );
        Self {
            data: self.data.clone(),
            shape: shape.to_vec(),
        }
    }

    /// Borrow row `i` of a 2D tensor as a slice.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2D or the row is out of range.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        assert_eq!(self.ndim(), 2, "row() requires a 2D tensor");
        let cols = self.shape[1];
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Copy a contiguous block of rows from a 2D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2D or the range is out of bounds.
    #[must_use]
    pub fn narrow_rows(&self, start: usize, len: usize) -> Self {
        assert_eq!(self.ndim(), 2, "narrow_rows() requires a 2D tensor");
        let cols = self.shape[1];
        assert!(
            start + len <= self.shape[0],
            "Row range {}..{} out of bounds for {} rows",
            start,
            start + len,
            self.shape[0]
        );
        Self {
            data: self.data[start * cols..(start + len) * cols].to_vec(),
            shape: vec![len, cols],
        }
    }

    /// Matrix multiplication of two 2D tensors.
    ///
    /// # Panics
    ///
    /// Panics if inner dimensions don't match.
    #[must_use]
    pub fn matmul(&self, other: &Self) -> Self {
        assert_eq!(self.ndim(), 2, "matmul() requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul() requires 2D tensors");
        let (m, k) = (self.shape[0], self.shape[1]);
        let (k2, n) = (other.shape[0], other.shape[1]);
        assert_eq!(
            k, k2,
            "Inner dimensions don't match: {:?} x {:?}",
            self.shape, other.shape
        );

        let mut out = vec![0.0f32; m * n];
        for i in 0..m {
            for kk in 0..k {
                let a = self.data[i * k + kk];
                if a == 0.0 {
                    continue;
                }
                let brow = &other.data[kk * n..(kk + 1) * n];
                let orow = &mut out[i * n..(i + 1) * n];
                for (o, &b) in orow.iter_mut().zip(brow.iter()) {
                    *o += a * b;
                }
            }
        }

        Self {
            data: out,
            shape: vec![m, n],
        }
    }

    /// Transpose a 2D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2D.
    #[must_use]
    pub fn transpose(&self) -> Self {
        assert_eq!(self.ndim(), 2, "transpose() requires a 2D tensor");
        let (rows, cols) = (self.shape[0], self.shape[1]);
        let mut data = vec![0.0f32; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data[i * cols + j];
            }
        }
        Self {
            data,
            shape: vec![cols, rows],
        }
    }

    /// Element-wise addition.
    ///
    /// # Panics
    ///
    /// Panics if shapes differ.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        assert_eq!(
            self.shape, other.shape,
            "Shapes must match for addition: {:?} vs {:?}",
            self.shape, other.shape
        );
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a + b)
            .collect();
        Self {
            data,
            shape: self.shape.clone(),
        }
    }

    /// Add a 1D bias to every row of the last dimension.
    ///
    /// # Panics
    ///
    /// Panics if the bias length doesn't match the last dimension.
    #[must_use]
    pub fn broadcast_add(&self, bias: &Self) -> Self {
        assert_eq!(bias.ndim(), 1, "broadcast_add() requires a 1D bias");
        let last = *self.shape.last().expect("tensor has at least one dim");
        assert_eq!(
            bias.numel(),
            last,
            "Bias length {} doesn't match last dimension {}",
            bias.numel(),
            last
        );
        let data: Vec<f32> = self
            .data
            .iter()
            .enumerate()
            .map(|(i, &v)| v + bias.data[i % last])
            .collect();
        Self {
            data,
            shape: self.shape.clone(),
        }
    }

    /// Concatenate two 2D tensors along the column axis.
    ///
    /// # Panics
    ///
    /// Panics if row counts differ.
    #[must_use]
    pub fn concat_cols(&self, other: &Self) -> Self {
        assert_eq!(self.ndim(), 2, "concat_cols() requires 2D tensors");
        assert_eq!(other.ndim(), 2, "concat_cols() requires 2D tensors");
        assert_eq!(
            self.shape[0], other.shape[0],
            "Row counts must match: {} vs {}",
            self.shape[0], other.shape[0]
        );
        let rows = self.shape[0];
        let (ca, cb) = (self.shape[1], other.shape[1]);
        let mut data = Vec::with_capacity(rows * (ca + cb));
        for i in 0..rows {
            data.extend_from_slice(&self.data[i * ca..(i + 1) * ca]);
            data.extend_from_slice(&other.data[i * cb..(i + 1) * cb]);
        }
        Self {
            data,
            shape: vec![rows, ca + cb],
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
