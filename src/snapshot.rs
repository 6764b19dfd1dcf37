//! Parameter Snapshots
//!
//! A snapshot is a named-tensor store: the model config plus one tensor per
//! parameter name from [`RecurrentClassifier::collect_parameters`]. It is
//! written as JSON so it can be inspected by hand.
//!
//! ## File Format
//!
//! ```text
//! {
//!   "config":  { "embedding_dim": 16, "hidden_size": 32, ... },
//!   "tensors": {
//!     "Whh":        { "shape": [32, 32], "data": [...] },
//!     "embeddings": { "shape": [16, 1001], "data": [...] },
//!     ...
//!   }
//! }
//! ```
//!
//! Tensors are keyed by name, so load order never matters. Shapes are checked
//! against the model when the snapshot is loaded into it.
//!
//! [`RecurrentClassifier::collect_parameters`]: crate::RecurrentClassifier::collect_parameters

use crate::classifier::ModelConfig;
use crate::error::{ClassifierError, Result};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Model config and named parameter tensors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: ModelConfig,
    pub tensors: BTreeMap<String, Tensor>,
}

impl Snapshot {
    /// Tensor stored under `name`
    ///
    /// # Errors
    ///
    /// [`ClassifierError::MissingParameter`] if there is none
    pub fn tensor(&self, name: &str) -> Result<&Tensor> {
        self.tensors
            .get(name)
            .ok_or_else(|| ClassifierError::MissingParameter(name.to_string()))
    }

    /// Save snapshot to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        println!("💾 Saving snapshot to {}...", path.display());

        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;

        let values: usize = self.tensors.values().map(|t| t.data.len()).sum();
        println!(
            "✅ Snapshot saved: {} tensors, {} parameters",
            self.tensors.len(),
            values
        );
        Ok(())
    }

    /// Load snapshot from a JSON file
    ///
    /// Tensors whose data length doesn't match their shape are rejected here;
    /// shapes are checked against a model by
    /// [`load_snapshot`](crate::RecurrentClassifier::load_snapshot).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        println!("📂 Loading snapshot from {}...", path.display());

        let json = fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&json)?;
        snapshot.config.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RecurrentClassifier;
    use crate::dictionary::{Token, Vocabulary};
    use crate::layers::CellKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("snapshot_{}_{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_missing_tensor() {
        let snapshot = Snapshot {
            config: ModelConfig::tiny(2),
            tensors: BTreeMap::new(),
        };
        assert!(matches!(
            snapshot.tensor("Wxh"),
            Err(ClassifierError::MissingParameter(name)) if name == "Wxh"
        ));
    }

    #[test]
    fn test_file_round_trip_preserves_model() {
        let vocab = Vocabulary::from_corpus("a b c d".split_whitespace(), 1);
        let mut config = ModelConfig::tiny(3);
        config.cell = CellKind::Gru;
        let mut model = RecurrentClassifier::new(&vocab, config).unwrap();
        model.initialize(&mut StdRng::seed_from_u64(7)).unwrap();

        let path = temp_path("round_trip");
        model.snapshot().save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, model.snapshot());
        let restored = RecurrentClassifier::from_snapshot(&vocab, &loaded).unwrap();
        let sequence = vocab.encode("d a x".split_whitespace());
        assert_eq!(sequence[2], Token::Unknown);
        assert_eq!(
            restored.forward(&sequence).unwrap().probabilities,
            model.forward(&sequence).unwrap().probabilities
        );
    }

    #[test]
    fn test_load_rejects_inconsistent_tensor() {
        let path = temp_path("bad_tensor");
        let json = r#"{
            "config": {"embedding_dim": 2, "hidden_size": 2, "output_size": 2},
            "tensors": {"bh": {"shape": [3], "data": [0.0, 0.0]}}
        }"#;
        fs::write(&path, json).unwrap();
        let result = Snapshot::load(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ClassifierError::Json(_))));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let json = r#"{
            "config": {"embedding_dim": 2, "hidden_size": 3, "output_size": 4},
            "tensors": {}
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.config.cell, CellKind::Elman);
        assert!(snapshot.config.use_initial_state);
    }
}
