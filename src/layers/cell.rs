//! Recurrent Cells
//!
//! A recurrent cell is the part of the network applied once per timestep:
//!
//! ```text
//! h[t] = cell(x[t], h[t-1])
//! ```
//!
//! The classifier unrolls a cell over the sequence and runs backpropagation
//! through time by calling [`RecurrentCell::backward_step`] in strictly
//! descending time order. Cells are trait objects chosen from a [`CellKind`]
//! when the classifier is built.
//!
//! ## Gradient Layout
//!
//! Gradient accumulators for a cell are a `Vec<Tensor>` laid out as
//! `weights()` followed by `biases()`. [`RecurrentCell::zero_gradients`]
//! creates them; `backward_step` adds into them, since the same weights are
//! reused at every timestep.

use super::activation::Activation;
use super::elman::ElmanCell;
use super::gru::GruCell;
use crate::tensor::Tensor;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which recurrence to build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum CellKind {
    /// h = act(Wxh x + bh + Whh h_prev)
    #[default]
    Elman,
    /// Gated recurrent unit with update and reset gates
    Gru,
}

impl CellKind {
    /// Build a zero-initialized cell of this kind
    pub fn build(
        self,
        input_size: usize,
        hidden_size: usize,
        activation: Activation,
    ) -> Box<dyn RecurrentCell> {
        match self {
            CellKind::Elman => Box::new(ElmanCell::new(input_size, hidden_size, activation)),
            CellKind::Gru => Box::new(GruCell::new(input_size, hidden_size, activation)),
        }
    }
}

/// Values one timestep leaves behind for the backward pass
#[derive(Clone, Debug)]
pub struct StepCache {
    /// New hidden state h[t]
    pub h: Vec<f64>,
    /// Intermediate activations (none for Elman; z, r and candidate for GRU)
    pub gates: Vec<Vec<f64>>,
}

/// Gradients flowing out of one timestep
pub struct StepGradients {
    /// Gradient w.r.t. the input x[t]
    pub x: Vec<f64>,
    /// Gradient w.r.t. the previous hidden state h[t-1]
    pub h_prev: Vec<f64>,
}

/// One timestep of a recurrence, with its exact derivative
pub trait RecurrentCell: Send + Sync {
    fn input_size(&self) -> usize;

    fn hidden_size(&self) -> usize;

    /// Named weight matrices, in enumeration order
    fn weights(&self) -> Vec<(&'static str, &Tensor)>;

    /// Named bias vectors, in enumeration order
    fn biases(&self) -> Vec<(&'static str, &Tensor)>;

    fn weights_mut(&mut self) -> Vec<(&'static str, &mut Tensor)>;

    fn biases_mut(&mut self) -> Vec<(&'static str, &mut Tensor)>;

    /// Forward one timestep: h[t] from x[t] and h[t-1]
    fn step(&self, x: &[f64], h_prev: &[f64]) -> StepCache;

    /// Backward one timestep
    ///
    /// # Arguments
    ///
    /// * `grad_h` - Gradient of the loss w.r.t. h[t]
    /// * `x` - Input at this timestep
    /// * `h_prev` - Hidden state the step consumed (the initial state at t = 0)
    /// * `from_initial_state` - True at t = 0
    /// * `cache` - What `step` returned for this timestep
    /// * `grads` - Accumulators laid out as `weights()` then `biases()`
    fn backward_step(
        &self,
        grad_h: &[f64],
        x: &[f64],
        h_prev: &[f64],
        from_initial_state: bool,
        cache: &StepCache,
        grads: &mut [Tensor],
    ) -> StepGradients;

    /// Zero accumulators matching `weights()` then `biases()`
    fn zero_gradients(&self) -> Vec<Tensor> {
        self.weights()
            .into_iter()
            .chain(self.biases())
            .map(|(_, tensor)| Tensor::zeros(tensor.shape.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_selects_cell() {
        let elman = CellKind::Elman.build(3, 4, Activation::Logistic);
        let names: Vec<_> = elman.weights().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Wxh", "Whh"]);

        let gru = CellKind::Gru.build(3, 4, Activation::Tanh);
        let names: Vec<_> = gru.biases().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["bh", "bz", "br"]);
        assert_eq!(gru.input_size(), 3);
        assert_eq!(gru.hidden_size(), 4);
    }

    #[test]
    fn test_zero_gradients_match_parameters() {
        let cell = CellKind::Gru.build(2, 3, Activation::Logistic);
        let grads = cell.zero_gradients();
        let params: Vec<_> = cell.weights().into_iter().chain(cell.biases()).collect();
        assert_eq!(grads.len(), params.len());
        for (g, (_, p)) in grads.iter().zip(params) {
            assert_eq!(g.shape, p.shape);
            assert!(g.data.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_cell_kind_serde_names() {
        assert_eq!(serde_json::to_string(&CellKind::Gru).unwrap(), "\"gru\"");
        let kind: CellKind = serde_json::from_str("\"elman\"").unwrap();
        assert_eq!(kind, CellKind::Elman);
    }

    #[test]
    fn test_cli_names_match_serde_names() {
        for kind in CellKind::value_variants() {
            let cli = kind.to_possible_value().unwrap();
            let stored = serde_json::to_string(kind).unwrap();
            assert_eq!(format!("\"{}\"", cli.get_name()), stored);
        }
        assert_eq!(CellKind::from_str("gru", false).unwrap(), CellKind::Gru);
        assert!(CellKind::from_str("lstm", false).is_err());
    }
}
