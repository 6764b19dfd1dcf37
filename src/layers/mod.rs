//! Neural Network Layers
//!
//! This module contains the building blocks of the recurrent classifier.
//! Each layer provides both forward and backward passes for training.
//!
//! ## Layers
//!
//! - **activation**: Element-wise nonlinearities and their derivatives
//! - **embedding**: Token lookup table with sparse SGD updates
//! - **cell**: The `RecurrentCell` trait shared by all recurrences
//! - **elman**: Single-layer Elman recurrence (the reference cell)
//! - **gru**: Gated recurrent unit
//! - **linear**: Output projection from the final hidden state
//!
//! ## Design Pattern
//!
//! Each trainable layer follows a consistent pattern:
//!
//! ```rust,ignore
//! impl TrainableLayer {
//!     pub fn forward(&self, x: &[f64]) -> (Vec<f64>, Cache) { }
//!     pub fn backward(&self, grad: &[f64], cache: &Cache) -> Gradients { }
//! }
//! ```
//!
//! Recurrent cells use the same split per timestep: `step` returns a
//! `StepCache`, and `backward_step` consumes it.

pub mod activation;
pub mod cell;
pub mod elman;
pub mod embedding;
pub mod gru;
pub mod linear;

pub use activation::Activation;
pub use cell::{CellKind, RecurrentCell, StepCache, StepGradients};
pub use elman::ElmanCell;
pub use embedding::{EmbeddingLayer, EMBEDDINGS};
pub use gru::GruCell;
pub use linear::{LinearCache, LinearGradients, TrainableLinear};
