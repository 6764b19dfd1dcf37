//! Recurrent Sequence Classifier
//!
//! This module ties the layers together into a trainable classifier: token
//! embeddings feed a recurrent cell, and the final hidden state is projected
//! to one score per class.
//!
//! ## Overview
//!
//! Training a classifier requires three things:
//! 1. **Forward pass**: Unroll the recurrence over the sequence
//! 2. **Backward pass**: Backpropagate the loss through every timestep (BPTT)
//! 3. **Optimization**: Apply SGD to every parameter and scatter the input
//!    gradient into the embedding table
//!
//! ## Data Flow
//!
//! ```text
//! tokens ─► embeddings ─► x [T, embedding_dim]
//!                            │
//!       h0 ─► cell ─► cell ─► … ─► cell ─► h[T-1]
//!                                            │
//!                          logits = Why · h[T-1] + by
//!                          probabilities = exp(logits - logsumexp(logits))
//! ```
//!
//! Only the final timestep produces output. Intermediate hidden states are
//! cached for the backward pass and are never scored.
//!
//! ## Backpropagation Through Time
//!
//! ```text
//! dy = probabilities;  dy[label] -= 1
//! dWhy = dy ⊗ h[T-1];  dby = dy;  dh = Why^T · dy
//! for t = T-1 down to 0:
//!     (dh, dx[t]) = cell.backward_step(dh, ...)
//! dh0 = dh
//! ```
//!
//! The loop runs in strictly descending time order: each step consumes the
//! hidden-state gradient produced by the step after it. Cell weights are
//! shared across timesteps, so their gradients accumulate over the loop.
//!
//! ## Parameter Names
//!
//! Every trainable tensor has a stable name, used for initialization and
//! snapshots:
//!
//! ```text
//! weights: embeddings, Wxh, Whh, [Wxz, Whz, Wxr, Whr,] Why
//! biases:  bh, [bz, br,] by, [h0]
//! ```
//!
//! Bracketed names depend on the cell kind and on `use_initial_state`.

use crate::dictionary::{Dictionary, Token};
use crate::error::{ClassifierError, Result};
use crate::layers::{
    Activation, CellKind, EmbeddingLayer, LinearCache, RecurrentCell, StepCache,
    TrainableLinear, EMBEDDINGS,
};
use crate::optimizer::sgd_update;
use crate::snapshot::Snapshot;
use crate::tensor::{argmax, log_sum_exp, softmax, Tensor};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output projection weight
pub const OUTPUT_WEIGHT: &str = "Why";
/// Output projection bias
pub const OUTPUT_BIAS: &str = "by";
/// Trainable initial hidden state
pub const INITIAL_STATE: &str = "h0";

/// Parameters paired with their enumeration names
pub type NamedTensors<'a> = Vec<(&'static str, &'a Tensor)>;

/// Model architecture configuration
///
/// Shapes of every parameter follow from these values and the dictionary
/// size; they never change after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub embedding_dim: usize,
    pub hidden_size: usize,
    /// Number of output classes
    pub output_size: usize,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default)]
    pub cell: CellKind,
    /// Learn the hidden state fed into the first timestep
    #[serde(default = "default_use_initial_state")]
    pub use_initial_state: bool,
}

fn default_use_initial_state() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 64,
            hidden_size: 128,
            output_size: 2,
            activation: Activation::Logistic,
            cell: CellKind::Elman,
            use_initial_state: true,
        }
    }
}

impl ModelConfig {
    /// Create a tiny config for quick experiments
    ///
    /// # Arguments
    ///
    /// * `output_size` - Number of classes (e.g., from the training labels)
    pub fn tiny(output_size: usize) -> Self {
        Self {
            embedding_dim: 16,
            hidden_size: 32,
            output_size,
            ..Self::default()
        }
    }

    /// Reject configurations with an empty dimension
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("embedding_dim", self.embedding_dim),
            ("hidden_size", self.hidden_size),
            ("output_size", self.output_size),
        ] {
            if value == 0 {
                return Err(ClassifierError::InvalidConfig(format!(
                    "{field} must be positive"
                )));
            }
        }
        Ok(())
    }
}

/// Everything the forward pass leaves behind for one example
pub struct ForwardCache {
    /// Embedded input, one row per timestep: [seq_len, embedding_dim]
    pub x: Tensor,
    /// Hidden state fed into the first timestep
    pub initial_state: Vec<f64>,
    /// One entry per timestep
    pub hidden: Vec<StepCache>,
    pub output: LinearCache,
    pub logits: Vec<f64>,
    pub probabilities: Vec<f64>,
}

impl ForwardCache {
    /// Hidden state after the last timestep
    pub fn final_state(&self) -> &[f64] {
        self.hidden
            .last()
            .map_or(self.initial_state.as_slice(), |step| step.h.as_slice())
    }
}

/// Per-example gradients of the cross-entropy loss
///
/// Shapes mirror the parameters, except for `inputs`, which holds the
/// gradient for every timestep's embedded input rather than for the whole
/// embedding table.
pub struct ClassifierGradients {
    /// Gradient w.r.t. the embedded input: [seq_len, embedding_dim]
    pub inputs: Tensor,
    /// Cell gradients laid out as the cell's weights then biases
    pub cell: Vec<Tensor>,
    pub output_weight: Tensor,
    pub output_bias: Tensor,
    pub initial_state: Option<Tensor>,
}

/// Result of a single training step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Cross-entropy loss before the update
    pub loss: f64,
    /// Predicted class before the update
    pub predicted: usize,
}

/// Embedding layer, recurrent cell and output projection trained end to end
///
/// The classifier owns every parameter. The dictionary is borrowed and must
/// outlive the model.
pub struct RecurrentClassifier<'d> {
    embedding: EmbeddingLayer<'d>,
    cell: Box<dyn RecurrentCell>,
    output: TrainableLinear,
    initial_state: Option<Tensor>,
    config: ModelConfig,
}

impl<'d> RecurrentClassifier<'d> {
    /// Build a classifier with every parameter zero-filled
    ///
    /// Call [`initialize`](Self::initialize) or
    /// [`load_snapshot`](Self::load_snapshot) before training.
    pub fn new(dictionary: &'d dyn Dictionary, config: ModelConfig) -> Result<Self> {
        config.validate()?;

        let embedding = EmbeddingLayer::new(dictionary, config.embedding_dim);
        let cell = config
            .cell
            .build(config.embedding_dim, config.hidden_size, config.activation);
        let output = TrainableLinear::new(config.hidden_size, config.output_size);
        let initial_state = config
            .use_initial_state
            .then(|| Tensor::zeros(vec![config.hidden_size]));

        Ok(Self {
            embedding,
            cell,
            output,
            initial_state,
            config,
        })
    }

    /// Build a classifier from a snapshot's config and tensors
    pub fn from_snapshot(dictionary: &'d dyn Dictionary, snapshot: &Snapshot) -> Result<Self> {
        let mut model = Self::new(dictionary, snapshot.config.clone())?;
        model.load_snapshot(snapshot)?;
        Ok(model)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &'d dyn Dictionary {
        self.embedding.dictionary()
    }

    //=========================================================================
    // PARAMETERS
    //=========================================================================

    /// Named weight matrices and named bias vectors, in enumeration order
    pub fn collect_parameters(&self) -> (NamedTensors<'_>, NamedTensors<'_>) {
        let mut weights = vec![(EMBEDDINGS, &self.embedding.table)];
        weights.extend(self.cell.weights());
        weights.push((OUTPUT_WEIGHT, &self.output.weight));

        let mut biases = self.cell.biases();
        biases.push((OUTPUT_BIAS, &self.output.bias));
        if let Some(h0) = &self.initial_state {
            biases.push((INITIAL_STATE, h0));
        }
        (weights, biases)
    }

    fn weights_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        let mut weights = vec![(EMBEDDINGS, &mut self.embedding.table)];
        weights.extend(self.cell.weights_mut());
        weights.push((OUTPUT_WEIGHT, &mut self.output.weight));
        weights
    }

    fn biases_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        let mut biases = self.cell.biases_mut();
        biases.push((OUTPUT_BIAS, &mut self.output.bias));
        if let Some(h0) = self.initial_state.as_mut() {
            biases.push((INITIAL_STATE, h0));
        }
        biases
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Tensor> {
        let (weights, biases) = self.collect_parameters();
        weights
            .into_iter()
            .chain(biases)
            .find(|(n, _)| *n == name)
            .map(|(_, tensor)| tensor)
    }

    /// Mutably look up a parameter by name
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        let is_weight = self.collect_parameters().0.iter().any(|(n, _)| *n == name);
        let candidates = if is_weight {
            self.weights_mut()
        } else {
            self.biases_mut()
        };
        candidates
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, tensor)| tensor)
    }

    /// Total number of trainable values
    pub fn num_parameters(&self) -> usize {
        let (weights, biases) = self.collect_parameters();
        weights
            .iter()
            .chain(&biases)
            .map(|(_, tensor)| tensor.data.len())
            .sum()
    }

    /// Randomly initialize every parameter
    ///
    /// Biases and the initial state are zeroed. Each weight matrix is drawn
    /// uniformly from `[-max, max]` with
    ///
    /// ```text
    /// max = coeff × sqrt(6 / (fan_in + fan_out))
    /// ```
    ///
    /// where `fan_in`/`fan_out` are the column/row counts and `coeff` is 4 for
    /// the logistic activation, 1 otherwise. The same generator state always
    /// produces the same parameters.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let coeff = self.config.activation.init_coefficient();

        for (_, bias) in self.biases_mut() {
            bias.data.fill(0.0);
        }

        for (name, weight) in self.weights_mut() {
            let max = init_bound(coeff, weight);
            let distribution = Uniform::new_inclusive(-max, max).map_err(|e| {
                ClassifierError::InvalidConfig(format!("cannot initialize {name}: {e}"))
            })?;
            for value in weight.data.iter_mut() {
                *value = distribution.sample(rng);
            }
        }
        Ok(())
    }

    //=========================================================================
    // FORWARD
    //=========================================================================

    /// Forward pass over one sequence
    ///
    /// # Errors
    ///
    /// [`ClassifierError::EmptySequence`] if `sequence` has no tokens
    ///
    /// # Panics
    ///
    /// Panics if a token id is outside the dictionary
    pub fn forward(&self, sequence: &[Token]) -> Result<ForwardCache> {
        if sequence.is_empty() {
            return Err(ClassifierError::EmptySequence);
        }

        let x = self.embedding.lookup(sequence);
        let initial_state = match &self.initial_state {
            Some(h0) => h0.data.clone(),
            None => vec![0.0; self.config.hidden_size],
        };

        let mut hidden: Vec<StepCache> = Vec::with_capacity(sequence.len());
        for t in 0..sequence.len() {
            let h_prev = hidden.last().map_or(initial_state.as_slice(), |s| s.h.as_slice());
            let step = self.cell.step(x.row(t), h_prev);
            hidden.push(step);
        }

        let final_state = hidden.last().map_or(initial_state.as_slice(), |s| s.h.as_slice());
        let (logits, output) = self.output.forward(final_state);
        let probabilities = softmax(&logits);

        Ok(ForwardCache {
            x,
            initial_state,
            hidden,
            output,
            logits,
            probabilities,
        })
    }

    /// Cross-entropy loss of a forwarded example: `-ln p[label]`
    ///
    /// Computed as `logsumexp(logits) - logits[label]`, which stays finite even
    /// when `p[label]` underflows.
    pub fn cross_entropy(&self, cache: &ForwardCache, label: usize) -> Result<f64> {
        self.check_label(label)?;
        Ok(log_sum_exp(&cache.logits) - cache.logits[label])
    }

    /// Forward pass followed by [`cross_entropy`](Self::cross_entropy)
    pub fn loss(&self, sequence: &[Token], label: usize) -> Result<f64> {
        let cache = self.forward(sequence)?;
        self.cross_entropy(&cache, label)
    }

    /// Most probable class; the lowest index wins ties
    pub fn predict(&self, sequence: &[Token]) -> Result<usize> {
        let cache = self.forward(sequence)?;
        Ok(argmax(&cache.probabilities))
    }

    /// Fraction of sequences whose prediction matches the gold label
    ///
    /// Examples are independent read-only forward passes, so they are
    /// evaluated in parallel.
    ///
    /// # Errors
    ///
    /// - [`ClassifierError::EmptyDataset`] if there are no examples
    /// - [`ClassifierError::LengthMismatch`] if the inputs don't pair up
    /// - [`ClassifierError::EmptySequence`] if any sequence is empty
    pub fn evaluate(&self, sequences: &[Vec<Token>], labels: &[usize]) -> Result<f64> {
        if sequences.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                sequences: sequences.len(),
                labels: labels.len(),
            });
        }
        if sequences.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }

        let correct: usize = sequences
            .par_iter()
            .zip(labels.par_iter())
            .map(|(sequence, &label)| {
                self.predict(sequence)
                    .map(|predicted| usize::from(predicted == label))
            })
            .sum::<Result<usize>>()?;

        Ok(correct as f64 / sequences.len() as f64)
    }

    //=========================================================================
    // BACKWARD
    //=========================================================================

    /// Backward pass: gradients of the cross-entropy loss for one example
    ///
    /// Parameters are not modified; see
    /// [`apply_gradients`](Self::apply_gradients).
    ///
    /// # Arguments
    ///
    /// * `cache` - Result of [`forward`](Self::forward) on the example
    /// * `label` - Gold class
    pub fn backward(&self, cache: &ForwardCache, label: usize) -> Result<ClassifierGradients> {
        self.check_label(label)?;
        let seq_len = cache.hidden.len();
        if seq_len == 0 {
            return Err(ClassifierError::EmptySequence);
        }

        // Softmax + cross-entropy
        let mut grad_logits = cache.probabilities.clone();
        grad_logits[label] -= 1.0;

        let output_grads = self.output.backward(&grad_logits, &cache.output);

        let mut cell_grads = self.cell.zero_gradients();
        let mut grad_inputs = Tensor::zeros(cache.x.shape.clone());
        let mut grad_h = output_grads.x;

        for t in (0..seq_len).rev() {
            let h_prev = if t == 0 {
                cache.initial_state.as_slice()
            } else {
                cache.hidden[t - 1].h.as_slice()
            };
            let step = self.cell.backward_step(
                &grad_h,
                cache.x.row(t),
                h_prev,
                t == 0,
                &cache.hidden[t],
                &mut cell_grads,
            );
            grad_inputs.row_mut(t).copy_from_slice(&step.x);
            grad_h = step.h_prev;
        }

        let initial_state = self
            .initial_state
            .as_ref()
            .map(|h0| Tensor::new(grad_h, h0.shape.clone()));

        Ok(ClassifierGradients {
            inputs: grad_inputs,
            cell: cell_grads,
            output_weight: output_grads.weight,
            output_bias: output_grads.bias,
            initial_state,
        })
    }

    /// Apply one SGD step with the gradients of one example
    ///
    /// Every weight, bias and the initial state take `θ -= lr × g`; then the
    /// per-timestep input gradient is scattered into the embedding columns of
    /// `sequence`, in ascending time order.
    pub fn apply_gradients(
        &mut self,
        grads: &ClassifierGradients,
        sequence: &[Token],
        learning_rate: f64,
    ) {
        let num_cell_weights = self.cell.weights().len();
        let (weight_grads, bias_grads) = grads.cell.split_at(num_cell_weights);
        for ((_, param), grad) in self.cell.weights_mut().into_iter().zip(weight_grads) {
            sgd_update(param, grad, learning_rate);
        }
        for ((_, param), grad) in self.cell.biases_mut().into_iter().zip(bias_grads) {
            sgd_update(param, grad, learning_rate);
        }

        sgd_update(&mut self.output.weight, &grads.output_weight, learning_rate);
        sgd_update(&mut self.output.bias, &grads.output_bias, learning_rate);
        if let (Some(h0), Some(grad)) = (self.initial_state.as_mut(), &grads.initial_state) {
            sgd_update(h0, grad, learning_rate);
        }

        self.embedding
            .accumulate_gradient(sequence, &grads.inputs, learning_rate);
    }

    /// Forward, loss, backward and update on a single example
    pub fn train_step(
        &mut self,
        sequence: &[Token],
        label: usize,
        learning_rate: f64,
    ) -> Result<StepOutcome> {
        let cache = self.forward(sequence)?;
        let loss = self.cross_entropy(&cache, label)?;
        let predicted = argmax(&cache.probabilities);

        let grads = self.backward(&cache, label)?;
        self.apply_gradients(&grads, sequence, learning_rate);

        Ok(StepOutcome { loss, predicted })
    }

    //=========================================================================
    // SNAPSHOTS
    //=========================================================================

    /// Copy every named parameter into a snapshot
    pub fn snapshot(&self) -> Snapshot {
        let (weights, biases) = self.collect_parameters();
        let tensors: BTreeMap<String, Tensor> = weights
            .into_iter()
            .chain(biases)
            .map(|(name, tensor)| (name.to_string(), tensor.clone()))
            .collect();

        Snapshot {
            config: self.config.clone(),
            tensors,
        }
    }

    /// Load every named parameter from a snapshot
    ///
    /// All names and shapes are validated before anything is written, so a
    /// failed load leaves the model unchanged. Tensors the model doesn't
    /// enumerate are ignored.
    ///
    /// # Errors
    ///
    /// - [`ClassifierError::MissingParameter`] if a name is absent
    /// - [`ClassifierError::ShapeMismatch`] if a shape differs
    pub fn load_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let (weights, biases) = self.collect_parameters();
        for (name, tensor) in weights.into_iter().chain(biases) {
            let stored = snapshot.tensor(name)?;
            if stored.shape != tensor.shape {
                return Err(ClassifierError::ShapeMismatch {
                    name: name.to_string(),
                    expected: tensor.shape.clone(),
                    actual: stored.shape.clone(),
                });
            }
        }

        for (name, tensor) in self.weights_mut() {
            tensor.data.copy_from_slice(&snapshot.tensor(name)?.data);
        }
        for (name, tensor) in self.biases_mut() {
            tensor.data.copy_from_slice(&snapshot.tensor(name)?.data);
        }
        Ok(())
    }

    fn check_label(&self, label: usize) -> Result<()> {
        if label >= self.config.output_size {
            return Err(ClassifierError::LabelOutOfRange {
                label,
                num_classes: self.config.output_size,
            });
        }
        Ok(())
    }
}

fn init_bound(coeff: f64, weight: &Tensor) -> f64 {
    let fan_out = weight.rows() as f64;
    let fan_in = weight.cols() as f64;
    coeff * (6.0 / (fan_in + fan_out)).sqrt()
}
