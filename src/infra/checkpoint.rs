// ============================================================
// Layer 6 — Model Artifact Store
// ============================================================
// Saves and restores the trained-model artifact set using Burn's
// CompactRecorder for the weights and JSON/CSV for everything else.
//
// What one completed training run leaves behind:
//
//   models/
//     retention_model.mpk.gz   ← network weights (best epoch)
//     train_config.json        ← hyperparameters + architecture
//     scaler.json              ← fitted standardisation parameters
//     model_metadata.json      ← metrics, feature list, timestamps
//     feature_importance.csv   ← ranked first-layer magnitudes
//     training_history.csv     ← per-epoch curve (metrics logger)
//
// Why save the config separately?
//   Loading weights requires rebuilding the exact architecture
//   first (input width, hidden sizes, dropout). Without the config,
//   the record is just an opaque blob.
//
// The set is written once at the end of a successful run and is
// read-only from then on — the query agent never mutates it, and a
// failed run (NaN loss, early abort) leaves no weights behind.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::scaler::StandardScaler;
use crate::domain::traits::Persistable;
use crate::ml::evaluation::EvalMetrics;
use crate::ml::model::{RetentionNet, RetentionNetConfig};

const MODEL_FILE: &str = "retention_model";
const CONFIG_FILE: &str = "train_config.json";
const SCALER_FILE: &str = "scaler.json";
const METADATA_FILE: &str = "model_metadata.json";
const IMPORTANCE_FILE: &str = "feature_importance.csv";

/// Structured run metadata, serialised to model_metadata.json.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelMetadata {
    /// Training completion time, RFC 3339.
    pub trained_at: String,
    /// The epoch whose weights were kept.
    pub best_epoch: usize,
    /// Epochs actually run (≤ configured epochs under early stopping).
    pub epochs_run: usize,
    /// Held-out test-partition metrics.
    pub metrics: EvalMetrics,
    /// Feature names in model input order.
    pub feature_names: Vec<String>,
    /// The full hyperparameter set of the run.
    pub config: TrainConfig,
}

/// Manages the model-layer artifact directory.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save the network weights. CompactRecorder serialises the
    /// module record to MessagePack and gzips it; loading later
    /// fails if the architecture doesn't match.
    pub fn save_model<B: Backend>(&self, model: &RetentionNet<B>) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("failed to save model to '{}'", path.display()))?;
        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Rebuild the architecture from train_config.json and restore
    /// the saved weights into it.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<RetentionNet<B>> {
        let cfg = self.load_config()?;
        let model_cfg = RetentionNetConfig::new(
            cfg.input_dim,
            cfg.hidden_sizes.clone(),
            // Dropout is a no-op outside autodiff; zero keeps the
            // loaded artifact honest about being inference-only.
            0.0,
        );
        let model: RetentionNet<B> = model_cfg.init(device);

        let path = self.dir.join(MODEL_FILE);
        let record = CompactRecorder::new().load(path.clone(), device).with_context(
            || {
                format!(
                    "cannot load model weights from '{}' — has training run?",
                    path.display()
                )
            },
        )?;
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read config from '{}' — has training run?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<()> {
        scaler.save(&self.dir.join(SCALER_FILE))
    }

    pub fn load_scaler(&self) -> Result<StandardScaler> {
        StandardScaler::load(&self.dir.join(SCALER_FILE))
    }

    pub fn save_metadata(&self, metadata: &ModelMetadata) -> Result<()> {
        let path = self.dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write metadata to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_metadata(&self) -> Result<ModelMetadata> {
        let path = self.dir.join(METADATA_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("cannot read metadata from '{}'", path.display())
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Persist the ranked feature importances as a two-column CSV.
    pub fn save_feature_importance(&self, ranked: &[(String, f64)]) -> Result<()> {
        let path = self.dir.join(IMPORTANCE_FILE);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("cannot create '{}'", path.display()))?;
        writer.write_record(["feature", "importance"])?;
        for (name, importance) in ranked {
            writer.write_record([name.as_str(), &format!("{importance:.6}")])?;
        }
        writer.flush()?;
        Ok(())
    }
}
