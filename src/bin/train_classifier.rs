//! Train a Recurrent Sequence Classifier
//!
//! Reads tab-separated datasets (`label<TAB>tokens`), builds a vocabulary from
//! the training file, and runs per-example SGD for a number of epochs.
//!
//! ## Usage
//!
//! ```bash
//! # Train from scratch
//! cargo run --release --bin train_classifier -- \
//!     --train data/train.tsv --dev data/dev.tsv --test data/test.tsv \
//!     --epochs 20 --lr 0.05 --save runs/elman
//!
//! # Gated cell with tanh candidate, CSV log
//! cargo run --release --bin train_classifier -- \
//!     --train data/train.tsv --cell gru --activation tanh --log-csv gru.csv
//!
//! # Continue from a saved run
//! cargo run --release --bin train_classifier -- \
//!     --train data/train.tsv --load runs/elman --epochs 5
//! ```
//!
//! A run directory holds `snapshot.json` (config and parameters) and
//! `vocab.json` (the vocabulary the token ids refer to).

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rnn_classifier::{
    train, Activation, CellKind, Dataset, Dictionary, ModelConfig, RecurrentClassifier, Snapshot,
    TrainingConfig, TrainingLogger, Vocabulary,
};
use std::fs;
use std::path::Path;

const SNAPSHOT_FILE: &str = "snapshot.json";
const VOCAB_FILE: &str = "vocab.json";

#[derive(Parser)]
#[command(
    name = "train_classifier",
    about = "Train a recurrent sequence classifier with BPTT and SGD"
)]
struct Args {
    // Data
    /// Training set (label<TAB>tokens per line)
    #[arg(long)]
    train: String,

    /// Development set, evaluated after every epoch
    #[arg(long)]
    dev: Option<String>,

    /// Test set, evaluated after every epoch
    #[arg(long)]
    test: Option<String>,

    /// Words seen fewer times in the training set are out of vocabulary
    #[arg(long, default_value = "1")]
    min_count: usize,

    // Model architecture (ignored with --load)
    /// Embedding dimension
    #[arg(long, default_value = "16")]
    embedding_dim: usize,

    /// Hidden state size
    #[arg(long, default_value = "32")]
    hidden: usize,

    /// Recurrent cell
    #[arg(long, value_enum, default_value_t = CellKind::Elman)]
    cell: CellKind,

    /// Activation
    #[arg(long, value_enum, default_value_t = Activation::Logistic)]
    activation: Activation,

    /// Start every sequence from a zero state instead of a learned one
    #[arg(long)]
    no_initial_state: bool,

    // Training parameters
    /// Number of epochs
    #[arg(long, default_value = "10")]
    epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value = "0.01")]
    lr: f64,

    /// Seed for parameter initialization
    #[arg(long, default_value = "1234")]
    seed: u64,

    // Persistence
    /// Resume from a run directory
    #[arg(long)]
    load: Option<String>,

    /// Write the trained model to a run directory
    #[arg(long)]
    save: Option<String>,

    /// Mirror per-epoch metrics to a CSV file
    #[arg(long)]
    log_csv: Option<String>,
}

fn load_partition(path: Option<&str>, vocab: &Vocabulary) -> rnn_classifier::Result<Dataset> {
    match path {
        Some(path) => Dataset::from_file(path, vocab),
        None => Ok(Dataset::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let training = TrainingConfig {
        num_epochs: args.epochs,
        learning_rate: args.lr,
        seed: args.seed,
        log_path: args.log_csv.clone(),
    };
    training.validate()?;

    // ========================================================================
    // 1. Vocabulary and data
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("1. Loading Data");
    println!("{}", "=".repeat(70));

    let snapshot = match &args.load {
        Some(dir) => Some(Snapshot::load(Path::new(dir).join(SNAPSHOT_FILE))?),
        None => None,
    };
    let vocab = match &args.load {
        Some(dir) => Vocabulary::load(Path::new(dir).join(VOCAB_FILE))?,
        None => {
            let text = fs::read_to_string(&args.train)
                .map_err(|e| format!("cannot read {}: {}", args.train, e))?;
            rnn_classifier::train::build_vocabulary(&text, args.min_count)?
        }
    };
    println!("Vocabulary: {} words", vocab.num_words());

    let train_set = Dataset::from_file(&args.train, &vocab)?;
    let dev_set = load_partition(args.dev.as_deref(), &vocab)?;
    let test_set = load_partition(args.test.as_deref(), &vocab)?;
    println!(
        "Examples: {} train, {} dev, {} test",
        train_set.len(),
        dev_set.len(),
        test_set.len()
    );

    // ========================================================================
    // 2. Model
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("2. Model");
    println!("{}", "=".repeat(70));

    let mut model = match &snapshot {
        Some(snapshot) => RecurrentClassifier::from_snapshot(&vocab, snapshot)?,
        None => {
            let num_classes = [&train_set, &dev_set, &test_set]
                .iter()
                .filter_map(|d| d.max_label())
                .max()
                .map_or(0, |label| label + 1);
            let config = ModelConfig {
                embedding_dim: args.embedding_dim,
                hidden_size: args.hidden,
                output_size: num_classes,
                activation: args.activation,
                cell: args.cell,
                use_initial_state: !args.no_initial_state,
            };
            let mut model = RecurrentClassifier::new(&vocab, config)?;
            model.initialize(&mut StdRng::seed_from_u64(training.seed))?;
            model
        }
    };
    println!("  Config: {:?}", model.config());
    println!("  Parameters: {}", model.num_parameters());

    // ========================================================================
    // 3. Training
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("3. Training ({} epochs, lr {})", training.num_epochs, training.learning_rate);
    println!("{}", "=".repeat(70));

    let mut logger = match &training.log_path {
        Some(path) => Some(TrainingLogger::new(path)?),
        None => None,
    };
    let reports = train(
        &mut model,
        &train_set,
        &dev_set,
        &test_set,
        &training,
        logger.as_mut(),
    )?;

    if let Some(last) = reports.last() {
        println!("\nFinal: {}", last);
    }

    // ========================================================================
    // 4. Save
    // ========================================================================
    if let Some(dir) = &args.save {
        let dir = Path::new(dir);
        fs::create_dir_all(dir)?;
        model.snapshot().save(dir.join(SNAPSHOT_FILE))?;
        vocab.save(dir.join(VOCAB_FILE))?;
        println!("Vocabulary saved to {}", dir.join(VOCAB_FILE).display());
    }

    Ok(())
}
