//! Embedding Layer
//!
//! The embedding layer is a learnable lookup table: one column per vocabulary
//! entry plus the reserved out-of-vocabulary column 0.
//!
//! ## Forward Pass (gather)
//!
//! ```text
//! Table:  E [embedding_dim, num_words + 1]
//! Input:  tokens t_0 .. t_{T-1}
//! Output: x [T, embedding_dim]   with x[t] = E[:, column(t_t)]
//! ```
//!
//! The output keeps one row per timestep, the layout the rest of the crate
//! uses for per-timestep caches.
//!
//! ## Backward Pass (scatter)
//!
//! Embeddings are updated directly from the per-timestep input gradient:
//!
//! ```text
//! for t in 0..T:                       (ascending time)
//!     E[:, column(t_t)] -= lr × dx[t]
//! ```
//!
//! A token repeated within one sequence is updated once per occurrence, in
//! time order. Summing its gradients first and applying them once would round
//! differently and is not equivalent.

use crate::dictionary::{Dictionary, Token};
use crate::tensor::Tensor;

/// Name of the embedding table in parameter enumerations and snapshots
pub const EMBEDDINGS: &str = "embeddings";

/// Trainable token embeddings backed by a borrowed dictionary
pub struct EmbeddingLayer<'d> {
    /// Embedding table: [embedding_dim, num_words + 1]
    pub table: Tensor,
    dictionary: &'d dyn Dictionary,
}

impl<'d> EmbeddingLayer<'d> {
    /// Create a zero-filled embedding table sized from the dictionary
    ///
    /// # Arguments
    ///
    /// * `dictionary` - Vocabulary the token ids refer to
    /// * `embedding_dim` - Length of each embedding vector
    pub fn new(dictionary: &'d dyn Dictionary, embedding_dim: usize) -> Self {
        Self {
            table: Tensor::zeros(vec![embedding_dim, dictionary.num_words() + 1]),
            dictionary,
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.table.rows()
    }

    pub fn dictionary(&self) -> &'d dyn Dictionary {
        self.dictionary
    }

    /// Gather the embedding of every timestep
    ///
    /// # Returns
    ///
    /// Matrix [seq_len, embedding_dim] with row `t` holding the embedding of
    /// `sequence[t]`
    ///
    /// # Panics
    ///
    /// Panics if a `Token::Word` id is not below `num_words()`. Ids are
    /// expected to come from the same dictionary.
    pub fn lookup(&self, sequence: &[Token]) -> Tensor {
        let dim = self.embedding_dim();
        let mut x = Tensor::zeros(vec![sequence.len(), dim]);
        for (t, &token) in sequence.iter().enumerate() {
            let column = self.checked_column(token);
            for (i, value) in x.row_mut(t).iter_mut().enumerate() {
                *value = self.table.data[i * self.table.strides[0] + column];
            }
        }
        x
    }

    /// Apply the per-timestep input gradient to the touched columns
    ///
    /// # Arguments
    ///
    /// * `sequence` - Tokens of the example that produced `grad_x`
    /// * `grad_x` - Gradient w.r.t. the gathered embeddings [seq_len, embedding_dim]
    /// * `learning_rate` - SGD step size
    pub fn accumulate_gradient(&mut self, sequence: &[Token], grad_x: &Tensor, learning_rate: f64) {
        assert_eq!(
            grad_x.shape,
            vec![sequence.len(), self.embedding_dim()],
            "Embedding gradient shape doesn't match the sequence"
        );

        let stride = self.table.strides[0];
        for (t, &token) in sequence.iter().enumerate() {
            let column = self.checked_column(token);
            for (i, &g) in grad_x.row(t).iter().enumerate() {
                self.table.data[i * stride + column] -= learning_rate * g;
            }
        }
    }

    fn checked_column(&self, token: Token) -> usize {
        if let Token::Word(id) = token {
            assert!(
                id < self.dictionary.num_words(),
                "Token id {} out of range for vocabulary of {} words",
                id,
                self.dictionary.num_words()
            );
        }
        token.column()
    }
}
