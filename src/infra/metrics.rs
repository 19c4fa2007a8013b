// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per epoch so a run can be inspected or
// re-plotted after the fact.
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_loss,lr
//   0,0.412003,0.398410,0.000100
//   1,0.301557,0.310202,0.000100
//
// The file is recreated at the start of every training run so it
// always matches loss_plot.png.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,val_loss,lr";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 0)
    pub epoch: usize,

    /// Mean combined loss over all training batches
    pub train_loss: f64,

    /// Mean combined loss over the validation set
    pub val_loss: f64,

    /// Learning rate used during this epoch
    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, lr: f64) -> Self {
        Self { epoch, train_loss, val_loss, lr }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and start a fresh CSV with only the header row.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6},{:.6}", m.epoch, m.train_loss, m.val_loss, m.lr)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_appended_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(0, 1.5, 1.25, 1e-4)).unwrap();
        logger.log(&EpochMetrics::new(1, 1.0, 1.125, 1e-4)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            HEADER,
            "0,1.500000,1.250000,0.000100",
            "1,1.000000,1.125000,0.000100",
        ]);
    }

    #[test]
    fn test_new_run_truncates_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::create(dir.path()).unwrap()
            .log(&EpochMetrics::new(0, 1.0, 1.0, 1.0)).unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(logger.csv_path()).unwrap().lines().count(), 1);
    }
}
