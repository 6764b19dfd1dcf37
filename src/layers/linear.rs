//! Linear Layer (Output Projection)
//!
//! Maps the final hidden state to one score per class: y = W · h + b
//!
//! ## Forward Pass
//!
//! ```text
//! Input:  h [in_features]
//! Weight: W [out_features, in_features]
//! Bias:   b [out_features]
//! Output: y = W · h + b [out_features]
//! ```
//!
//! ## Backward Pass
//!
//! Using the chain rule:
//! ```text
//! grad_W = grad_y ⊗ h
//! grad_b = grad_y
//! grad_h = W^T · grad_y
//! ```

use crate::tensor::{add, Tensor};

/// Linear layer applied to a single vector
pub struct TrainableLinear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl TrainableLinear {
    /// Create a zero-initialized linear layer
    ///
    /// Weights are filled later by the classifier's initializer or a snapshot.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            weight: Tensor::zeros(vec![out_features, in_features]),
            bias: Tensor::zeros(vec![out_features]),
        }
    }

    /// Forward pass
    ///
    /// Computes y = W · h + b and caches h for the backward pass
    pub fn forward(&self, h: &[f64]) -> (Vec<f64>, LinearCache) {
        let y = add(&self.weight.matvec(h), &self.bias.data);
        let cache = LinearCache { x: h.to_vec() };
        (y, cache)
    }

    /// Backward pass
    ///
    /// # Arguments
    ///
    /// * `grad_out` - Gradient of the loss w.r.t. the layer output
    /// * `cache` - Cached input from the forward pass
    pub fn backward(&self, grad_out: &[f64], cache: &LinearCache) -> LinearGradients {
        let mut weight = Tensor::zeros(self.weight.shape.clone());
        weight.add_outer(grad_out, &cache.x);

        LinearGradients {
            weight,
            bias: Tensor::new(grad_out.to_vec(), self.bias.shape.clone()),
            x: self.weight.matvec_transposed(grad_out),
        }
    }
}

/// Cache for linear layer backward pass
pub struct LinearCache {
    pub x: Vec<f64>,
}

/// Gradients for linear layer
pub struct LinearGradients {
    pub weight: Tensor,
    pub bias: Tensor,
    pub x: Vec<f64>, // Gradient to pass to the recurrence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_adds_bias() {
        let mut layer = TrainableLinear::new(2, 3);
        layer.weight = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2]);
        layer.bias = Tensor::new(vec![0.5, -0.5, 0.0], vec![3]);

        let (y, cache) = layer.forward(&[2.0, 3.0]);
        assert_eq!(y, vec![2.5, 2.5, 5.0]);
        assert_eq!(cache.x, vec![2.0, 3.0]);
    }

    #[test]
    fn test_backward_shapes_and_values() {
        let mut layer = TrainableLinear::new(2, 2);
        layer.weight = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);

        let (_, cache) = layer.forward(&[1.0, -1.0]);
        let grads = layer.backward(&[0.5, -0.5], &cache);

        assert_eq!(grads.weight.data, vec![0.5, -0.5, -0.5, 0.5]);
        assert_eq!(grads.bias.data, vec![0.5, -0.5]);
        assert_eq!(grads.x, vec![0.5 - 1.5, 1.0 - 2.0]);
    }
}
