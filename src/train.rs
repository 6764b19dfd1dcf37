//! Datasets and the Training Loop
//!
//! This module loads labelled sequences from text and runs per-example SGD
//! over them.
//!
//! ## Dataset Files
//!
//! One example per line: the gold label, a tab, then whitespace-separated
//! tokens.
//!
//! ```text
//! 1	a gripping , funny film
//! 0	dull and far too long
//! ```
//!
//! Blank lines are skipped. Tokens missing from the vocabulary become
//! [`Token::Unknown`].
//!
//! ## Epochs
//!
//! ```text
//! for each training example, in file order:
//!     forward → loss, prediction → backward → SGD update
//! evaluate dev and test (no updates)
//! ```
//!
//! Updates are applied immediately after each example, so the final
//! parameters depend on the order of the training set. There is no shuffling
//! and no batching.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use rnn_classifier::{train, Dataset, ModelConfig, RecurrentClassifier, TrainingConfig};
//!
//! let text = std::fs::read_to_string("train.tsv")?;
//! let vocab = rnn_classifier::train::build_vocabulary(&text, 1)?;
//! let train_set = Dataset::parse(&text, &vocab)?;
//! let empty = Dataset::default();
//!
//! let mut model = RecurrentClassifier::new(&vocab, ModelConfig::tiny(2))?;
//! model.initialize(&mut StdRng::seed_from_u64(1234))?;
//! train(&mut model, &train_set, &empty, &empty, &TrainingConfig::quick(), None)?;
//! # Ok::<(), rnn_classifier::ClassifierError>(())
//! ```

use crate::classifier::RecurrentClassifier;
use crate::dictionary::{Dictionary, Token, Vocabulary};
use crate::error::{ClassifierError, Result};
use crate::training_logger::TrainingLogger;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Ordered token sequences with one gold label each
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub sequences: Vec<Vec<Token>>,
    pub labels: Vec<usize>,
}

impl Dataset {
    /// Pair sequences with labels
    ///
    /// # Errors
    ///
    /// [`ClassifierError::LengthMismatch`] if the counts differ
    pub fn new(sequences: Vec<Vec<Token>>, labels: Vec<usize>) -> Result<Self> {
        if sequences.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                sequences: sequences.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { sequences, labels })
    }

    /// Parse `label<TAB>tokens` lines, encoding tokens with `dictionary`
    pub fn parse(text: &str, dictionary: &Vocabulary) -> Result<Self> {
        let mut dataset = Self::default();
        for example in examples(text) {
            let (label, tokens) = example?;
            dataset.sequences.push(dictionary.encode(tokens));
            dataset.labels.push(label);
        }
        Ok(dataset)
    }

    /// Read and parse a dataset file
    pub fn from_file<P: AsRef<Path>>(path: P, dictionary: &Vocabulary) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, dictionary)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Largest gold label, or `None` for an empty dataset
    pub fn max_label(&self) -> Option<usize> {
        self.labels.iter().copied().max()
    }

    /// Check every label is below `num_classes`
    pub fn check_labels(&self, num_classes: usize) -> Result<()> {
        match self.labels.iter().find(|&&label| label >= num_classes) {
            Some(&label) => Err(ClassifierError::LabelOutOfRange { label, num_classes }),
            None => Ok(()),
        }
    }
}

/// Build a vocabulary from the tokens of a dataset file's text
///
/// Labels are not part of the vocabulary. Words seen fewer than `min_count`
/// times are left out and read as [`Token::Unknown`].
pub fn build_vocabulary(text: &str, min_count: usize) -> Result<Vocabulary> {
    let mut tokens = Vec::new();
    for example in examples(text) {
        tokens.extend(example?.1);
    }
    Ok(Vocabulary::from_corpus(tokens, min_count))
}

/// Parsed non-blank lines as `(label, tokens)`
fn examples(text: &str) -> impl Iterator<Item = Result<(usize, Vec<&str>)>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_line(index + 1, line))
}

fn parse_line(line_number: usize, line: &str) -> Result<(usize, Vec<&str>)> {
    let parse_error = |message: String| ClassifierError::Parse {
        line: line_number,
        message,
    };

    let (label, tokens) = line
        .split_once('\t')
        .ok_or_else(|| parse_error("expected <label><TAB><tokens>".to_string()))?;
    let label = label
        .trim()
        .parse::<usize>()
        .map_err(|e| parse_error(format!("invalid label {:?}: {}", label.trim(), e)))?;

    let tokens: Vec<&str> = tokens.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(parse_error("example has no tokens".to_string()));
    }
    Ok((label, tokens))
}

/// Training configuration
///
/// Hyperparameters for one training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes through the training set
    pub num_epochs: usize,
    /// SGD step size
    pub learning_rate: f64,
    /// Seed for parameter initialization
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Optional CSV file mirroring the per-epoch report
    #[serde(default)]
    pub log_path: Option<String>,
}

fn default_seed() -> u64 {
    1234
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_epochs: 10,
            learning_rate: 0.01,
            seed: default_seed(),
            log_path: None,
        }
    }
}

impl TrainingConfig {
    /// Create a short, aggressive configuration for quick experiments
    pub fn quick() -> Self {
        Self {
            num_epochs: 3,
            learning_rate: 0.1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ClassifierError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Metrics for one completed epoch
///
/// Dev and test accuracy are `None` when the partition is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochReport {
    /// Epoch number, counting from 1
    pub epoch: usize,
    /// Sum of per-example losses, each taken before that example's update
    pub total_loss: f64,
    pub train_accuracy: f64,
    pub dev_accuracy: Option<f64>,
    pub test_accuracy: Option<f64>,
    /// Wall time of the sweep plus evaluation
    pub elapsed: Duration,
}

impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch: {} Total loss: {:.6} Accuracy train: {:.4} Accuracy dev: {} Accuracy test: {} Time: {} ms",
            self.epoch,
            self.total_loss,
            self.train_accuracy,
            Accuracy(self.dev_accuracy),
            Accuracy(self.test_accuracy),
            self.elapsed.as_millis()
        )
    }
}

/// Accuracy formatted like the train column, or `n/a`
pub(crate) struct Accuracy(pub Option<f64>);

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(accuracy) => write!(f, "{:.4}", accuracy),
            None => write!(f, "n/a"),
        }
    }
}

/// Accuracy on a partition, or `None` if it has no examples
pub fn accuracy_or_none(model: &RecurrentClassifier, dataset: &Dataset) -> Result<Option<f64>> {
    if dataset.is_empty() {
        return Ok(None);
    }
    model.evaluate(&dataset.sequences, &dataset.labels).map(Some)
}

/// One sweep of per-example SGD over `train`, then dev/test evaluation
///
/// # Errors
///
/// - [`ClassifierError::EmptyDataset`] if `train` has no examples
/// - [`ClassifierError::LabelOutOfRange`] if a training label is not a class
/// - [`ClassifierError::EmptySequence`] if a training sequence is empty
pub fn train_epoch(
    model: &mut RecurrentClassifier,
    train: &Dataset,
    dev: &Dataset,
    test: &Dataset,
    epoch: usize,
    learning_rate: f64,
) -> Result<EpochReport> {
    if train.is_empty() {
        return Err(ClassifierError::EmptyDataset);
    }
    let start = Instant::now();

    let mut total_loss = 0.0;
    let mut correct = 0;
    for (sequence, &label) in train.sequences.iter().zip(&train.labels) {
        let outcome = model.train_step(sequence, label, learning_rate)?;
        total_loss += outcome.loss;
        if outcome.predicted == label {
            correct += 1;
        }
    }
    let train_accuracy = correct as f64 / train.len() as f64;

    let dev_accuracy = accuracy_or_none(model, dev)?;
    let test_accuracy = accuracy_or_none(model, test)?;

    Ok(EpochReport {
        epoch,
        total_loss,
        train_accuracy,
        dev_accuracy,
        test_accuracy,
        elapsed: start.elapsed(),
    })
}

/// Train for `config.num_epochs` epochs
///
/// Prints the dev accuracy before training, then one line per epoch. With a
/// logger, each epoch is also appended to its CSV file.
///
/// # Returns
///
/// One report per epoch, in order
pub fn train(
    model: &mut RecurrentClassifier,
    train: &Dataset,
    dev: &Dataset,
    test: &Dataset,
    config: &TrainingConfig,
    mut logger: Option<&mut TrainingLogger>,
) -> Result<Vec<EpochReport>> {
    config.validate()?;
    if train.is_empty() {
        return Err(ClassifierError::EmptyDataset);
    }
    let num_classes = model.config().output_size;
    for partition in [train, dev, test] {
        partition.check_labels(num_classes)?;
    }

    println!(
        "Training on {} examples ({} words, {} parameters)",
        train.len(),
        model.dictionary().num_words(),
        model.num_parameters()
    );
    println!(" Initial accuracy dev: {}", Accuracy(accuracy_or_none(model, dev)?));

    let mut reports = Vec::with_capacity(config.num_epochs);
    for epoch in 1..=config.num_epochs {
        let report = train_epoch(model, train, dev, test, epoch, config.learning_rate)?;
        match logger.as_deref_mut() {
            Some(logger) => logger.log(&report, config.learning_rate)?,
            None => println!("{}", report),
        }
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ModelConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CORPUS: &str = "1\tgood great fun\n\
                          0\tbad awful dull\n\
                          \n\
                          1\tgreat fun\n\
                          0\tdull bad\n";

    fn model(vocab: &Vocabulary, seed: u64) -> RecurrentClassifier<'_> {
        let config = ModelConfig {
            embedding_dim: 4,
            hidden_size: 6,
            output_size: 2,
            ..ModelConfig::default()
        };
        let mut model = RecurrentClassifier::new(vocab, config).unwrap();
        model.initialize(&mut StdRng::seed_from_u64(seed)).unwrap();
        model
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let vocab = build_vocabulary(CORPUS, 1).unwrap();
        assert_eq!(vocab.num_words(), 6);
        assert_eq!(vocab.lookup("1"), None);

        let dataset = Dataset::parse(CORPUS, &vocab).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.labels, vec![1, 0, 1, 0]);
        assert_eq!(dataset.sequences[3], vec![Token::Word(5), Token::Word(3)]);
        assert_eq!(dataset.max_label(), Some(1));
    }

    #[test]
    fn test_unknown_words_encode_as_unknown() {
        let vocab = build_vocabulary(CORPUS, 2).unwrap();
        assert_eq!(vocab.lookup("good"), None);

        let dataset = Dataset::parse("1\tgood fun\n", &vocab).unwrap();
        assert_eq!(dataset.sequences[0][0], Token::Unknown);
        assert!(matches!(dataset.sequences[0][1], Token::Word(_)));
    }

    #[test]
    fn test_parse_errors_report_line() {
        let vocab = Vocabulary::new();
        for (text, bad_line) in [
            ("1\tok\nno tab here\n", 2),
            ("1\tok\n\nx\tword\n", 3),
            ("0\t   \n", 1),
        ] {
            match Dataset::parse(text, &vocab) {
                Err(ClassifierError::Parse { line, .. }) => assert_eq!(line, bad_line, "{:?}", text),
                other => panic!("expected parse error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_dataset_new_checks_lengths() {
        assert!(matches!(
            Dataset::new(vec![vec![Token::Unknown]], vec![]),
            Err(ClassifierError::LengthMismatch { sequences: 1, labels: 0 })
        ));
        let dataset = Dataset::new(vec![vec![Token::Unknown]], vec![4]).unwrap();
        assert!(dataset.check_labels(5).is_ok());
        assert!(matches!(
            dataset.check_labels(4),
            Err(ClassifierError::LabelOutOfRange { label: 4, num_classes: 4 })
        ));
    }

    #[test]
    fn test_report_format() {
        let report = EpochReport {
            epoch: 2,
            total_loss: 1.5,
            train_accuracy: 0.75,
            dev_accuracy: Some(0.5),
            test_accuracy: None,
            elapsed: Duration::from_millis(42),
        };
        assert_eq!(
            report.to_string(),
            "Epoch: 2 Total loss: 1.500000 Accuracy train: 0.7500 Accuracy dev: 0.5000 Accuracy test: n/a Time: 42 ms"
        );
    }

    #[test]
    fn test_training_reduces_loss() {
        let vocab = build_vocabulary(CORPUS, 1).unwrap();
        let dataset = Dataset::parse(CORPUS, &vocab).unwrap();
        let mut model = model(&vocab, 3);

        let config = TrainingConfig {
            num_epochs: 60,
            learning_rate: 0.5,
            ..TrainingConfig::default()
        };
        let reports = train(&mut model, &dataset, &dataset, &Dataset::default(), &config, None).unwrap();

        assert_eq!(reports.len(), 60);
        assert_eq!(reports[0].epoch, 1);
        assert_eq!(reports[59].epoch, 60);
        assert!(reports[59].total_loss < reports[0].total_loss);
        assert_eq!(reports[59].dev_accuracy, Some(1.0));
        assert_eq!(reports[59].test_accuracy, None);
    }

    #[test]
    fn test_training_is_reproducible() {
        let vocab = build_vocabulary(CORPUS, 1).unwrap();
        let dataset = Dataset::parse(CORPUS, &vocab).unwrap();

        let run = || {
            let mut model = model(&vocab, 9);
            train_epoch(&mut model, &dataset, &Dataset::default(), &Dataset::default(), 1, 0.1).unwrap();
            model.snapshot()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_example_order_changes_parameters() {
        let vocab = build_vocabulary(CORPUS, 1).unwrap();
        let forward = Dataset::parse(CORPUS, &vocab).unwrap();
        let mut reversed = forward.clone();
        reversed.sequences.reverse();
        reversed.labels.reverse();

        let empty = Dataset::default();
        let mut a = model(&vocab, 9);
        let mut b = model(&vocab, 9);
        train_epoch(&mut a, &forward, &empty, &empty, 1, 0.1).unwrap();
        train_epoch(&mut b, &reversed, &empty, &empty, 1, 0.1).unwrap();
        assert_ne!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_degenerate_partitions() {
        let vocab = build_vocabulary(CORPUS, 1).unwrap();
        let dataset = Dataset::parse(CORPUS, &vocab).unwrap();
        let empty = Dataset::default();
        let mut model = model(&vocab, 1);

        assert!(matches!(
            train_epoch(&mut model, &empty, &dataset, &dataset, 1, 0.1),
            Err(ClassifierError::EmptyDataset)
        ));

        let bad_labels = Dataset::new(dataset.sequences.clone(), vec![0, 1, 2, 0]).unwrap();
        assert!(matches!(
            train(&mut model, &bad_labels, &empty, &empty, &TrainingConfig::quick(), None),
            Err(ClassifierError::LabelOutOfRange { label: 2, .. })
        ));

        let config = TrainingConfig {
            learning_rate: 0.0,
            ..TrainingConfig::quick()
        };
        assert!(matches!(
            train(&mut model, &dataset, &empty, &empty, &config, None),
            Err(ClassifierError::InvalidConfig(_))
        ));
    }
}
