//! Elman Recurrence
//!
//! The reference cell: a single affine map of the input and previous state,
//! followed by an element-wise nonlinearity.
//!
//! ## Forward
//!
//! ```text
//! h[t] = act(Wxh · x[t] + bh + Whh · h[t-1])
//! ```
//!
//! ## Backward
//!
//! ```text
//! dh_raw  = dh ⊙ act'(h[t])
//! dWxh   += dh_raw ⊗ x[t]
//! dbh    += dh_raw
//! dWhh   += dh_raw ⊗ h[t-1]        only for t > 0
//! dh_prev = Whh^T · dh_raw
//! dx[t]   = Wxh^T · dh_raw
//! ```
//!
//! At t = 0 no recurrence-weight gradient is taken from the initial state; its
//! gradient goes to the initial-state parameter through `dh_prev` instead.

use super::activation::Activation;
use super::cell::{RecurrentCell, StepCache, StepGradients};
use crate::tensor::{add, hadamard, Tensor};

/// Single-layer Elman cell
pub struct ElmanCell {
    /// Input weights: [hidden_size, input_size]
    pub w_xh: Tensor,
    /// Recurrence weights: [hidden_size, hidden_size]
    pub w_hh: Tensor,
    /// Recurrence bias: [hidden_size]
    pub b_h: Tensor,
    pub activation: Activation,
}

impl ElmanCell {
    pub fn new(input_size: usize, hidden_size: usize, activation: Activation) -> Self {
        Self {
            w_xh: Tensor::zeros(vec![hidden_size, input_size]),
            w_hh: Tensor::zeros(vec![hidden_size, hidden_size]),
            b_h: Tensor::zeros(vec![hidden_size]),
            activation,
        }
    }
}

impl RecurrentCell for ElmanCell {
    fn input_size(&self) -> usize {
        self.w_xh.cols()
    }

    fn hidden_size(&self) -> usize {
        self.w_xh.rows()
    }

    fn weights(&self) -> Vec<(&'static str, &Tensor)> {
        vec![("Wxh", &self.w_xh), ("Whh", &self.w_hh)]
    }

    fn biases(&self) -> Vec<(&'static str, &Tensor)> {
        vec![("bh", &self.b_h)]
    }

    fn weights_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        vec![("Wxh", &mut self.w_xh), ("Whh", &mut self.w_hh)]
    }

    fn biases_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        vec![("bh", &mut self.b_h)]
    }

    fn step(&self, x: &[f64], h_prev: &[f64]) -> StepCache {
        let pre = add(
            &add(&self.w_xh.matvec(x), &self.b_h.data),
            &self.w_hh.matvec(h_prev),
        );
        StepCache {
            h: self.activation.evaluate(&pre),
            gates: Vec::new(),
        }
    }

    fn backward_step(
        &self,
        grad_h: &[f64],
        x: &[f64],
        h_prev: &[f64],
        from_initial_state: bool,
        cache: &StepCache,
        grads: &mut [Tensor],
    ) -> StepGradients {
        let [d_wxh, d_whh, d_bh] = grads else {
            panic!("Elman cell expects 3 gradient accumulators");
        };

        let grad_raw = hadamard(grad_h, &self.activation.derivative(&cache.h));

        d_wxh.add_outer(&grad_raw, x);
        d_bh.add_assign_slice(&grad_raw);
        if !from_initial_state {
            d_whh.add_outer(&grad_raw, h_prev);
        }

        StepGradients {
            x: self.w_xh.matvec_transposed(&grad_raw),
            h_prev: self.w_hh.matvec_transposed(&grad_raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cell() -> ElmanCell {
        let mut cell = ElmanCell::new(2, 2, Activation::Logistic);
        cell.w_xh = Tensor::new(vec![0.5, -0.25, 1.0, 0.75], vec![2, 2]);
        cell.w_hh = Tensor::new(vec![0.1, 0.2, -0.3, 0.4], vec![2, 2]);
        cell.b_h = Tensor::new(vec![0.05, -0.05], vec![2]);
        cell
    }

    #[test]
    fn test_step_matches_formula() {
        let cell = small_cell();
        let x = [1.0, 2.0];
        let h_prev = [0.5, -1.0];
        let step = cell.step(&x, &h_prev);

        let pre0: f64 = 0.5 * 1.0 - 0.25 * 2.0 + 0.05 + 0.1 * 0.5 + 0.2 * -1.0;
        let pre1: f64 = 1.0 * 1.0 + 0.75 * 2.0 - 0.05 - 0.3 * 0.5 + 0.4 * -1.0;
        let expected = [1.0 / (1.0 + (-pre0).exp()), 1.0 / (1.0 + (-pre1).exp())];
        for (h, e) in step.h.iter().zip(expected) {
            assert!((h - e).abs() < 1e-12);
        }
        assert!(step.gates.is_empty());
    }

    #[test]
    fn test_first_step_skips_recurrence_gradient() {
        let cell = small_cell();
        let x = [1.0, 2.0];
        let h0 = [0.3, 0.7];
        let cache = cell.step(&x, &h0);

        let mut grads = cell.zero_gradients();
        cell.backward_step(&[1.0, -1.0], &x, &h0, true, &cache, &mut grads);
        assert!(grads[1].data.iter().all(|&v| v == 0.0));
        assert!(grads[0].data.iter().any(|&v| v != 0.0));

        let mut grads = cell.zero_gradients();
        cell.backward_step(&[1.0, -1.0], &x, &h0, false, &cache, &mut grads);
        assert!(grads[1].data.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_backward_input_gradient_by_finite_difference() {
        let cell = small_cell();
        let x = [0.4, -0.8];
        let h_prev = [0.2, 0.6];
        // Scalar objective: w · h
        let w = [0.7, -1.3];
        let objective = |x: &[f64], h: &[f64]| -> f64 {
            let out = cell.step(x, h).h;
            out.iter().zip(w).map(|(a, b)| a * b).sum()
        };

        let cache = cell.step(&x, &h_prev);
        let mut grads = cell.zero_gradients();
        let step_grads = cell.backward_step(&w, &x, &h_prev, false, &cache, &mut grads);

        let eps = 1e-6;
        for i in 0..2 {
            let (mut plus, mut minus) = (x, x);
            plus[i] += eps;
            minus[i] -= eps;
            let numeric = (objective(&plus, &h_prev) - objective(&minus, &h_prev)) / (2.0 * eps);
            assert!((numeric - step_grads.x[i]).abs() < 1e-8);

            let (mut plus, mut minus) = (h_prev, h_prev);
            plus[i] += eps;
            minus[i] -= eps;
            let numeric = (objective(&x, &plus) - objective(&x, &minus)) / (2.0 * eps);
            assert!((numeric - step_grads.h_prev[i]).abs() < 1e-8);
        }
    }
}
