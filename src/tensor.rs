//! Tensor Operations for Recurrent Networks
//!
//! This module provides the small amount of linear algebra a single-layer
//! recurrent classifier needs. Matrices are stored the same way throughout the
//! crate so that parameter snapshots, gradients and caches all agree on layout.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f64>` storing all elements in row-major order
//! - **Shape**: Dimensions of the tensor (e.g., `[rows, cols]`)
//! - **Strides**: Step sizes for each dimension to compute flat indices
//!
//! Vectors that flow through the recurrence (hidden states, biases applied to
//! a single timestep, logits) are plain `&[f64]` slices; the free functions at
//! the bottom of this module operate on them.
//!
//! ## Example
//!
//! ```rust
//! use rnn_classifier::Tensor;
//!
//! // W is [2, 3]: two output rows, three input columns
//! let w = Tensor::new(vec![1.0, 0.0, 2.0, 0.0, 1.0, 0.0], vec![2, 3]);
//! let y = w.matvec(&[1.0, 2.0, 3.0]);
//! assert_eq!(y, vec![7.0, 2.0]);
//! ```
//!
//! ## Numerical Stability
//!
//! [`log_sum_exp`] subtracts the maximum before exponentiating, and
//! [`softmax`] is defined as `exp(v - log_sum_exp(v))`. Raw logits are never
//! exponentiated directly.

use serde::{Deserialize, Serialize};

/// A dense row-major array of `f64` values
///
/// Weight matrices follow the `[fan_out, fan_in]` convention: `W · x` maps a
/// vector of length `shape[1]` to one of length `shape[0]`.
///
/// # Memory Layout
///
/// For shape `[2, 3]`, data is stored as: `[r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]`
/// and strides are `[3, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredTensor", into = "StoredTensor")]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f64>,
    /// Shape of the tensor (dimensions)
    pub shape: Vec<usize>,
    /// Strides for each dimension (computed from shape)
    pub strides: Vec<usize>,
}

/// On-disk form of a tensor; strides are recomputed on load.
#[derive(Serialize, Deserialize)]
struct StoredTensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TryFrom<StoredTensor> for Tensor {
    type Error = String;

    fn try_from(stored: StoredTensor) -> Result<Self, Self::Error> {
        let expected_size: usize = stored.shape.iter().product();
        if stored.data.len() != expected_size {
            return Err(format!(
                "tensor data length {} doesn't match shape {:?}",
                stored.data.len(),
                stored.shape
            ));
        }
        Ok(Tensor::new(stored.data, stored.shape))
    }
}

impl From<Tensor> for StoredTensor {
    fn from(tensor: Tensor) -> Self {
        Self {
            shape: tensor.shape,
            data: tensor.data,
        }
    }
}

impl Tensor {
    /// Create a new tensor with given data and shape
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length
    ///
    /// # Example
    ///
    /// ```rust
    /// # use rnn_classifier::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// assert_eq!(tensor.shape, vec![2, 2]);
    /// assert_eq!(tensor.strides, vec![2, 1]);
    /// ```
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_size
        );

        let strides = Self::compute_strides(&shape);
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Create a tensor filled with zeros
    ///
    /// # Example
    ///
    /// ```rust
    /// # use rnn_classifier::Tensor;
    /// let tensor = Tensor::zeros(vec![3, 4]);
    /// assert_eq!(tensor.data.len(), 12);
    /// assert!(tensor.data.iter().all(|&x| x == 0.0));
    /// ```
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        Self::new(vec![0.0; size], shape)
    }

    /// Compute strides from shape (row-major layout)
    ///
    /// For shape `[d0, d1, d2]`, strides are `[d1*d2, d2, 1]`
    fn compute_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    /// Number of rows of a matrix
    pub fn rows(&self) -> usize {
        assert_eq!(self.shape.len(), 2, "rows() requires a matrix, got {:?}", self.shape);
        self.shape[0]
    }

    /// Number of columns of a matrix
    pub fn cols(&self) -> usize {
        assert_eq!(self.shape.len(), 2, "cols() requires a matrix, got {:?}", self.shape);
        self.shape[1]
    }

    /// Borrow row `i` of a matrix
    pub fn row(&self, i: usize) -> &[f64] {
        let cols = self.cols();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Mutably borrow row `i` of a matrix
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let cols = self.cols();
        &mut self.data[i * cols..(i + 1) * cols]
    }

    /// Copy column `j` of a matrix into a new vector
    ///
    /// # Example
    ///
    /// ```rust
    /// # use rnn_classifier::Tensor;
    /// let m = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    /// assert_eq!(m.column(1), vec![2.0, 5.0]);
    /// ```
    pub fn column(&self, j: usize) -> Vec<f64> {
        let cols = self.cols();
        assert!(j < cols, "Column {} out of range for shape {:?}", j, self.shape);
        self.data.iter().skip(j).step_by(cols).copied().collect()
    }

    /// Matrix-vector product `W · v`
    ///
    /// # Panics
    ///
    /// Panics if `v.len()` differs from the number of columns
    pub fn matvec(&self, v: &[f64]) -> Vec<f64> {
        let cols = self.cols();
        assert_eq!(
            cols,
            v.len(),
            "Matrix-vector dimensions incompatible: {:?} · [{}]",
            self.shape,
            v.len()
        );

        self.data
            .chunks_exact(cols)
            .map(|row| dot(row, v))
            .collect()
    }

    /// Transposed matrix-vector product `W^T · v`
    ///
    /// This is the backward counterpart of [`Tensor::matvec`]: it carries a
    /// gradient on the output side of `W` back to the input side.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use rnn_classifier::Tensor;
    /// let w = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    /// assert_eq!(w.matvec_transposed(&[1.0, 1.0]), vec![5.0, 7.0, 9.0]);
    /// ```
    pub fn matvec_transposed(&self, v: &[f64]) -> Vec<f64> {
        let (rows, cols) = (self.rows(), self.cols());
        assert_eq!(
            rows,
            v.len(),
            "Transposed matrix-vector dimensions incompatible: {:?}^T · [{}]",
            self.shape,
            v.len()
        );

        let mut result = vec![0.0; cols];
        for (row, &scale) in self.data.chunks_exact(cols).zip(v) {
            for (r, &w) in result.iter_mut().zip(row) {
                *r += scale * w;
            }
        }
        result
    }

    /// Accumulate an outer product in place: `self += a ⊗ b`
    ///
    /// Used for every weight gradient in the backward pass, where `a` is the
    /// gradient on the output side and `b` the cached input.
    pub fn add_outer(&mut self, a: &[f64], b: &[f64]) {
        let (rows, cols) = (self.rows(), self.cols());
        assert!(
            a.len() == rows && b.len() == cols,
            "Outer product [{}] ⊗ [{}] doesn't match shape {:?}",
            a.len(),
            b.len(),
            self.shape
        );

        for (row, &scale) in self.data.chunks_exact_mut(cols).zip(a) {
            for (r, &x) in row.iter_mut().zip(b) {
                *r += scale * x;
            }
        }
    }

    /// Element-wise accumulate: `self += other` (vectors or matching shapes)
    pub fn add_assign_slice(&mut self, other: &[f64]) {
        assert_eq!(
            self.data.len(),
            other.len(),
            "Length mismatch for accumulation: {:?} += [{}]",
            self.shape,
            other.len()
        );
        for (a, &b) in self.data.iter_mut().zip(other) {
            *a += b;
        }
    }
}

/// Dot product of two equal-length slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Element-wise sum of two slices
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "Shapes must match for addition");
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Element-wise difference `a - b`
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "Shapes must match for subtraction");
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Element-wise (Hadamard) product
pub fn hadamard(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "Shapes must match for element-wise product");
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

/// Numerically stable `ln(Σ exp(v_i))`
///
/// # Numerical Stability
///
/// ```text
/// logsumexp(v) = max(v) + ln(Σ exp(v_i - max(v)))
/// ```
///
/// Every exponent is at most zero, so nothing overflows even for logits in the
/// thousands.
///
/// # Example
///
/// ```rust
/// # use rnn_classifier::tensor::log_sum_exp;
/// let lse = log_sum_exp(&[1000.0, 1000.0]);
/// assert!((lse - (1000.0 + 2f64.ln())).abs() < 1e-9);
/// ```
pub fn log_sum_exp(v: &[f64]) -> f64 {
    let max = v.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = v.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Softmax through the log-partition function: `exp(v - logsumexp(v))`
pub fn softmax(v: &[f64]) -> Vec<f64> {
    let log_partition = log_sum_exp(v);
    v.iter().map(|&x| (x - log_partition).exp()).collect()
}

/// Index of the largest element; the first maximum wins ties
///
/// # Panics
///
/// Panics on an empty slice
///
/// # Example
///
/// ```rust
/// # use rnn_classifier::tensor::argmax;
/// assert_eq!(argmax(&[0.5, 0.5]), 0);
/// assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
/// ```
pub fn argmax(v: &[f64]) -> usize {
    assert!(!v.is_empty(), "argmax of an empty vector");
    let mut best = 0;
    for (i, &x) in v.iter().enumerate().skip(1) {
        if x > v[best] {
            best = i;
        }
    }
    best
}
