//! Stochastic Gradient Descent
//!
//! Parameters are updated once per example, immediately after its backward
//! pass:
//!
//! ```text
//! θ = θ - α × g
//! ```
//!
//! There is no momentum, weight decay or clipping. Because every example
//! updates the shared parameters before the next one is seen, final parameter
//! values depend on the order of the training set.
//!
//! ## Implementation Notes
//!
//! - Parallel element updates using Rayon for large tensors
//! - Automatic fallback to sequential for small tensors
//!
//! Both paths perform the same independent per-element arithmetic, so the
//! result does not depend on which one runs.

use crate::tensor::Tensor;
use rayon::prelude::*;

/// Apply one SGD step to a parameter tensor in place
///
/// # Arguments
///
/// * `param` - Parameter to update
/// * `grad` - Gradient of the per-example loss w.r.t. `param`
/// * `lr` - Learning rate
///
/// # Panics
///
/// Panics if the gradient shape doesn't match the parameter shape
///
/// # Example
///
/// ```rust
/// # use rnn_classifier::Tensor;
/// # use rnn_classifier::optimizer::sgd_update;
/// let mut w = Tensor::new(vec![1.0, 2.0], vec![2]);
/// let g = Tensor::new(vec![10.0, -10.0], vec![2]);
/// sgd_update(&mut w, &g, 0.1);
/// assert_eq!(w.data, vec![0.0, 3.0]);
/// ```
pub fn sgd_update(param: &mut Tensor, grad: &Tensor, lr: f64) {
    assert_eq!(
        param.shape, grad.shape,
        "Gradient shape {:?} doesn't match parameter shape {:?}",
        grad.shape, param.shape
    );

    // Parallelize for large tensors (>1000 elements)
    if param.data.len() > 1000 {
        param
            .data
            .par_iter_mut()
            .zip(grad.data.par_iter())
            .for_each(|(p, &g)| *p -= lr * g);
    } else {
        for (p, &g) in param.data.iter_mut().zip(&grad.data) {
            *p -= lr * g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_tensor_update_is_elementwise() {
        let n = 1500;
        let grad = Tensor::new((0..n).map(|i| (i as f64).sin()).collect(), vec![n]);

        let mut large = Tensor::new((0..n).map(|i| i as f64 * 0.01).collect(), vec![n]);
        sgd_update(&mut large, &grad, 0.3);

        for i in (0..n).step_by(97) {
            let expected = i as f64 * 0.01 - 0.3 * (i as f64).sin();
            assert_eq!(large.data[i], expected);
        }
    }

    #[test]
    #[should_panic(expected = "doesn't match parameter shape")]
    fn test_shape_mismatch_panics() {
        let mut w = Tensor::zeros(vec![2, 2]);
        sgd_update(&mut w, &Tensor::zeros(vec![4]), 0.1);
    }
}
