//! Error Types
//!
//! Recoverable failures: degenerate inputs, bad files and snapshot mismatches.
//! Contract violations in the numeric core (a token id outside the vocabulary,
//! operands of incompatible shape) are not represented here; they panic.

use std::fmt;

/// Errors produced by the classifier, its snapshots and the training driver.
#[derive(Debug)]
pub enum ClassifierError {
    /// A sequence with no timesteps has no final hidden state to classify.
    EmptySequence,
    /// Accuracy over zero examples is undefined.
    EmptyDataset,
    /// A gold label is not a valid output class.
    LabelOutOfRange { label: usize, num_classes: usize },
    /// Sequences and labels of a dataset don't pair up.
    LengthMismatch { sequences: usize, labels: usize },
    /// A snapshot lacks a tensor the model enumerates.
    MissingParameter(String),
    /// A snapshot tensor has the wrong shape for its name.
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// Invalid model or training configuration.
    InvalidConfig(String),
    /// Malformed line in a dataset file (1-based line number).
    Parse { line: usize, message: String },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySequence => write!(f, "cannot run the recurrence on an empty sequence"),
            Self::EmptyDataset => write!(f, "accuracy is undefined for an empty dataset"),
            Self::LabelOutOfRange { label, num_classes } => {
                write!(f, "label {label} out of range for {num_classes} classes")
            }
            Self::LengthMismatch { sequences, labels } => {
                write!(f, "{sequences} sequences but {labels} labels")
            }
            Self::MissingParameter(name) => write!(f, "snapshot has no parameter named {name:?}"),
            Self::ShapeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "parameter {name:?} has shape {actual:?}, expected {expected:?}"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Parse { line, message } => write!(f, "line {line}: {message}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for ClassifierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClassifierError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_messages() {
        let err = ClassifierError::ShapeMismatch {
            name: "Wxh".to_string(),
            expected: vec![4, 3],
            actual: vec![3, 4],
        };
        assert_eq!(
            err.to_string(),
            "parameter \"Wxh\" has shape [3, 4], expected [4, 3]"
        );
        assert_eq!(
            ClassifierError::LabelOutOfRange {
                label: 3,
                num_classes: 2
            }
            .to_string(),
            "label 3 out of range for 2 classes"
        );
    }

    #[test]
    fn test_io_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ClassifierError::from(io);
        assert!(err.source().is_some());
        assert!(ClassifierError::EmptySequence.source().is_none());
    }
}
