//! Gated Recurrent Unit
//!
//! A drop-in alternative to the Elman cell. Two logistic gates decide how much
//! of the previous state to expose to the candidate and how much of the
//! candidate to blend into the new state.
//!
//! ## Forward
//!
//! ```text
//! z = σ(Wxz · x + bz + Whz · h_prev)            update gate
//! r = σ(Wxr · x + br + Whr · h_prev)            reset gate
//! u = act(Wxh · x + bh + Whh · (r ⊙ h_prev))    candidate
//! h = z ⊙ (u - h_prev) + h_prev
//! ```
//!
//! ## Backward
//!
//! ```text
//! du_raw = (z ⊙ dh) ⊙ act'(u)
//! dq     = Whh^T · du_raw                       gradient w.r.t. r ⊙ h_prev
//! dz_raw = ((u - h_prev) ⊙ dh) ⊙ z(1 - z)
//! dr_raw = (h_prev ⊙ dq) ⊙ r(1 - r)
//! dh_prev = Whz^T dz_raw + Whr^T dr_raw + r ⊙ dq + (1 - z) ⊙ dh
//! dx      = Wxz^T dz_raw + Wxr^T dr_raw + Wxh^T du_raw
//! ```
//!
//! Unlike the Elman cell, the recurrence weights also receive the t = 0 term,
//! computed from the initial state.

use super::activation::Activation;
use super::cell::{RecurrentCell, StepCache, StepGradients};
use crate::tensor::{add, hadamard, sub, Tensor};

const UPDATE: usize = 0;
const RESET: usize = 1;
const CANDIDATE: usize = 2;

/// Gated recurrent unit cell
pub struct GruCell {
    pub w_xh: Tensor,
    pub w_hh: Tensor,
    pub w_xz: Tensor,
    pub w_hz: Tensor,
    pub w_xr: Tensor,
    pub w_hr: Tensor,
    pub b_h: Tensor,
    pub b_z: Tensor,
    pub b_r: Tensor,
    /// Nonlinearity of the candidate state; gates are always logistic
    pub activation: Activation,
}

impl GruCell {
    pub fn new(input_size: usize, hidden_size: usize, activation: Activation) -> Self {
        let input = || Tensor::zeros(vec![hidden_size, input_size]);
        let recurrent = || Tensor::zeros(vec![hidden_size, hidden_size]);
        let bias = || Tensor::zeros(vec![hidden_size]);
        Self {
            w_xh: input(),
            w_hh: recurrent(),
            w_xz: input(),
            w_hz: recurrent(),
            w_xr: input(),
            w_hr: recurrent(),
            b_h: bias(),
            b_z: bias(),
            b_r: bias(),
            activation,
        }
    }

    fn gate(w_x: &Tensor, b: &Tensor, w_h: &Tensor, x: &[f64], h: &[f64]) -> Vec<f64> {
        let pre = add(&add(&w_x.matvec(x), &b.data), &w_h.matvec(h));
        Activation::Logistic.evaluate(&pre)
    }
}

impl RecurrentCell for GruCell {
    fn input_size(&self) -> usize {
        self.w_xh.cols()
    }

    fn hidden_size(&self) -> usize {
        self.w_xh.rows()
    }

    fn weights(&self) -> Vec<(&'static str, &Tensor)> {
        vec![
            ("Wxh", &self.w_xh),
            ("Whh", &self.w_hh),
            ("Wxz", &self.w_xz),
            ("Whz", &self.w_hz),
            ("Wxr", &self.w_xr),
            ("Whr", &self.w_hr),
        ]
    }

    fn biases(&self) -> Vec<(&'static str, &Tensor)> {
        vec![("bh", &self.b_h), ("bz", &self.b_z), ("br", &self.b_r)]
    }

    fn weights_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        vec![
            ("Wxh", &mut self.w_xh),
            ("Whh", &mut self.w_hh),
            ("Wxz", &mut self.w_xz),
            ("Whz", &mut self.w_hz),
            ("Wxr", &mut self.w_xr),
            ("Whr", &mut self.w_hr),
        ]
    }

    fn biases_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        vec![
            ("bh", &mut self.b_h),
            ("bz", &mut self.b_z),
            ("br", &mut self.b_r),
        ]
    }

    fn step(&self, x: &[f64], h_prev: &[f64]) -> StepCache {
        let z = Self::gate(&self.w_xz, &self.b_z, &self.w_hz, x, h_prev);
        let r = Self::gate(&self.w_xr, &self.b_r, &self.w_hr, x, h_prev);

        let reset_state = hadamard(&r, h_prev);
        let pre = add(
            &add(&self.w_xh.matvec(x), &self.b_h.data),
            &self.w_hh.matvec(&reset_state),
        );
        let u = self.activation.evaluate(&pre);

        let h = add(&hadamard(&z, &sub(&u, h_prev)), h_prev);
        StepCache {
            h,
            gates: vec![z, r, u],
        }
    }

    fn backward_step(
        &self,
        grad_h: &[f64],
        x: &[f64],
        h_prev: &[f64],
        _from_initial_state: bool,
        cache: &StepCache,
        grads: &mut [Tensor],
    ) -> StepGradients {
        let [d_wxh, d_whh, d_wxz, d_whz, d_wxr, d_whr, d_bh, d_bz, d_br] = grads else {
            panic!("GRU cell expects 9 gradient accumulators");
        };
        let z = &cache.gates[UPDATE];
        let r = &cache.gates[RESET];
        let u = &cache.gates[CANDIDATE];

        // Candidate path
        let grad_u_raw = hadamard(&hadamard(z, grad_h), &self.activation.derivative(u));
        let grad_reset_state = self.w_hh.matvec_transposed(&grad_u_raw);

        // Gate paths
        let grad_z_raw = hadamard(
            &hadamard(&sub(u, h_prev), grad_h),
            &Activation::Logistic.derivative(z),
        );
        let grad_r_raw = hadamard(
            &hadamard(h_prev, &grad_reset_state),
            &Activation::Logistic.derivative(r),
        );

        d_wxh.add_outer(&grad_u_raw, x);
        d_bh.add_assign_slice(&grad_u_raw);
        d_whh.add_outer(&grad_u_raw, &hadamard(r, h_prev));

        d_wxz.add_outer(&grad_z_raw, x);
        d_bz.add_assign_slice(&grad_z_raw);
        d_whz.add_outer(&grad_z_raw, h_prev);

        d_wxr.add_outer(&grad_r_raw, x);
        d_br.add_assign_slice(&grad_r_raw);
        d_whr.add_outer(&grad_r_raw, h_prev);

        let carry: Vec<f64> = z.iter().zip(grad_h).map(|(&zi, &g)| (1.0 - zi) * g).collect();
        let grad_h_prev = add(
            &add(
                &self.w_hz.matvec_transposed(&grad_z_raw),
                &self.w_hr.matvec_transposed(&grad_r_raw),
            ),
            &add(&hadamard(r, &grad_reset_state), &carry),
        );

        let grad_x = add(
            &add(
                &self.w_xz.matvec_transposed(&grad_z_raw),
                &self.w_xr.matvec_transposed(&grad_r_raw),
            ),
            &self.w_xh.matvec_transposed(&grad_u_raw),
        );

        StepGradients {
            x: grad_x,
            h_prev: grad_h_prev,
        }
    }
}
