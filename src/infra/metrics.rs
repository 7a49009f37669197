// ============================================================
// Layer 6 — Training History Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Why log metrics to CSV?
//   - Easy to open in a spreadsheet and plot learning curves
//   - Provides a permanent record of each training run
//   - The run metadata references the same numbers
//
// Output file: models/training_history.csv, one row per epoch:
//
//   epoch,train_loss,val_loss,val_auc,learning_rate
//   1,0.693112,0.684201,0.612000,0.001000
//   2,0.641205,0.655480,0.671000,0.000950
//   ...
//
// How to read it:
//   - Both losses should fall; val_loss rising while train_loss
//     falls means overfitting and early stopping will kick in
//   - learning_rate shows the per-epoch decay schedule
//
// Unlike an append-only log, the file is TRUNCATED per run: the
// history belongs to exactly one training run, the same way the
// model weights do.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of metrics data for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average class-weighted BCE over all training batches
    pub train_loss: f64,

    /// Average class-weighted BCE on the validation partition.
    /// Drives both early stopping and best-epoch selection.
    pub val_loss: f64,

    /// Rank-based AUC on the validation partition
    pub val_auc: f64,

    /// The decayed learning rate used this epoch
    pub learning_rate: f64,
}

impl EpochMetrics {
    /// True if this epoch improved over the previous best val_loss.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Writes epoch metrics to training_history.csv under the model dir.
pub struct TrainingHistory {
    csv_path: PathBuf,
}

impl TrainingHistory {
    /// Start a fresh history file (header only) for one run.
    pub fn begin(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("training_history.csv");
        let mut file = fs::File::create(&csv_path)?;
        writeln!(file, "epoch,train_loss,val_loss,val_auc,learning_rate")?;
        tracing::debug!("Started training history at '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            file,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.val_auc, m.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {}: train_loss={:.4}, val_loss={:.4}, val_auc={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_auc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
