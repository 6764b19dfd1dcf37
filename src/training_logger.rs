//! Training Logger
//!
//! This module mirrors the per-epoch report to a CSV file for later analysis,
//! while still printing each epoch to the console.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rnn_classifier::TrainingLogger;
//!
//! let mut logger = TrainingLogger::new("training_log.csv")
//!     .expect("Failed to create logger");
//! ```
//!
//! Pass `Some(&mut logger)` to [`train`](crate::train()) to record every
//! epoch.
//!
//! ## CSV Format
//!
//! The logger writes CSV files with the following columns:
//! - `epoch`: Epoch number, starting at 1
//! - `elapsed_seconds`: Time since the logger was created
//! - `learning_rate`: SGD step size
//! - `total_loss`: Sum of per-example cross-entropy over the epoch
//! - `train_accuracy`: Accuracy on the training set during the sweep
//! - `dev_accuracy`: Accuracy on the dev set after the sweep (empty if no dev set)
//! - `test_accuracy`: Accuracy on the test set after the sweep (empty if no test set)

use crate::train::EpochReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Training logger for tracking metrics over epochs
///
/// # Fields
///
/// - `log_file`: Output CSV file
/// - `start_time`: When training started (for elapsed time calculation)
pub struct TrainingLogger {
    log_file: File,
    start_time: Instant,
}

impl TrainingLogger {
    /// Create a new training logger
    ///
    /// Creates a CSV file with headers and starts the clock.
    ///
    /// # Arguments
    ///
    /// * `log_path` - Path to CSV file to create
    pub fn new<P: AsRef<Path>>(log_path: P) -> std::io::Result<Self> {
        let mut log_file = File::create(log_path)?;

        writeln!(
            log_file,
            "epoch,elapsed_seconds,learning_rate,total_loss,train_accuracy,dev_accuracy,test_accuracy"
        )?;

        Ok(Self {
            log_file,
            start_time: Instant::now(),
        })
    }

    /// Log a completed epoch
    ///
    /// Writes one CSV row and prints the report line to the console.
    pub fn log(&mut self, report: &EpochReport, learning_rate: f64) -> std::io::Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let optional = |accuracy: Option<f64>| accuracy.map(|a| format!("{:.6}", a)).unwrap_or_default();

        writeln!(
            self.log_file,
            "{},{:.2},{},{:.6},{:.6},{},{}",
            report.epoch,
            elapsed,
            learning_rate,
            report.total_loss,
            report.train_accuracy,
            optional(report.dev_accuracy),
            optional(report.test_accuracy)
        )?;

        // Keep rows on disk if training aborts later
        self.log_file.flush()?;

        println!("{}", report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!("training_log_{}.csv", std::process::id()));
        let mut logger = TrainingLogger::new(&path).unwrap();

        for epoch in 1..=2 {
            let report = EpochReport {
                epoch,
                total_loss: 3.25,
                train_accuracy: 0.5,
                dev_accuracy: Some(0.25),
                test_accuracy: None,
                elapsed: Duration::from_millis(5),
            };
            logger.log(&report, 0.1).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("epoch,elapsed_seconds"));

        let fields: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0], "2");
        assert_eq!(fields[2], "0.1");
        assert_eq!(fields[3], "3.250000");
        assert_eq!(fields[5], "0.250000");
        assert_eq!(fields[6], "");
    }
}
