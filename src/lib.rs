//! RNN Classifier: Recurrent Sequence Classification From Scratch
//!
//! An embedding layer feeding a single-layer recurrent cell, trained end to
//! end with backpropagation through time and plain per-example SGD. One label
//! is predicted per token sequence, from the final hidden state.
//!
//! # Modules
//!
//! - [`tensor`] - Dense row-major tensors and stable softmax helpers
//! - [`dictionary`] - Token ids and the vocabulary
//! - [`layers`] - Embeddings, recurrent cells and the output projection
//! - [`classifier`] - Forward pass, BPTT and parameter management
//! - [`optimizer`] - SGD update
//! - [`snapshot`] - Named-tensor parameter files
//! - [`train`] - Datasets and the epoch loop
//! - [`training_logger`] - CSV progress log
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use rnn_classifier::{ModelConfig, RecurrentClassifier, Vocabulary};
//!
//! let vocab = Vocabulary::from_corpus("a fine film a dull film".split_whitespace(), 1);
//! let mut model = RecurrentClassifier::new(&vocab, ModelConfig::tiny(2))?;
//! model.initialize(&mut StdRng::seed_from_u64(1234))?;
//!
//! let sequence = vocab.encode("a fine film".split_whitespace());
//! let probabilities = model.forward(&sequence)?.probabilities;
//! assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
//!
//! let outcome = model.train_step(&sequence, 1, 0.1)?;
//! println!("loss before update: {:.4}", outcome.loss);
//! # Ok::<(), rnn_classifier::ClassifierError>(())
//! ```

pub mod classifier;
pub mod dictionary;
pub mod error;
pub mod layers;
pub mod optimizer;
pub mod snapshot;
pub mod tensor;
pub mod train;
pub mod training_logger;

// Re-export main types for convenience
pub use classifier::{
    ClassifierGradients, ForwardCache, ModelConfig, RecurrentClassifier, StepOutcome,
};
pub use dictionary::{Dictionary, Token, Vocabulary};
pub use error::{ClassifierError, Result};
pub use layers::{Activation, CellKind};
pub use snapshot::Snapshot;
pub use tensor::Tensor;
pub use train::{train, train_epoch, Dataset, EpochReport, TrainingConfig};
pub use training_logger::TrainingLogger;
