// ============================================================
// Layer 2 — Train Use Case
// ============================================================
// Processed layer in, model artifacts out:
//
//   1. read training_data.csv
//   2. stratified train / validation / test split (seeded)
//   3. fit the scaler on the TRAINING partition only
//   4. run the training loop (early stopping on validation loss)
//   5. evaluate the best epoch on the held-out test partition
//   6. persist weights, config, scaler, metadata, importances
//
// Nothing is written until training has finished and the test
// evaluation succeeded — a failed run leaves no partial artifact.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::dataset::{RetentionDataset, RetentionSample};
use crate::data::scaler::StandardScaler;
use crate::data::splitter::stratified_split;
use crate::domain::features::{TrainingExample, FEATURE_DIM, FEATURE_NAMES};
use crate::infra::checkpoint::{ArtifactStore, ModelMetadata};
use crate::infra::lake::DataLake;
use crate::infra::metrics::TrainingHistory;
use crate::ml::evaluation::{self, EvalMetrics};
use crate::ml::trainer::{run_training, InferenceBackend};

/// Every knob of one training run. Persisted to train_config.json so
/// the query stage can rebuild the exact architecture, and so a run
/// can be reproduced from its artifact directory alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub lake_root: String,
    pub models_dir: String,
    pub input_dim: usize,
    pub hidden_sizes: Vec<usize>,
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    /// Multiplicative per-epoch learning-rate decay in (0, 1].
    pub lr_decay: f64,
    /// L2 penalty, applied through Adam's weight decay.
    pub weight_decay: f32,
    /// Early-stopping patience in epochs without validation improvement.
    pub patience: usize,
    pub seed: u64,
    pub train_fraction: f64,
    pub val_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lake_root: "data".to_string(),
            models_dir: "models".to_string(),
            input_dim: FEATURE_DIM,
            hidden_sizes: vec![256, 128, 64, 32],
            dropout: 0.3,
            epochs: 100,
            batch_size: 64,
            lr: 1e-3,
            lr_decay: 0.97,
            weight_decay: 1e-4,
            patience: 10,
            seed: 42,
            train_fraction: 0.70,
            val_fraction: 0.15,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 || self.batch_size == 0 || self.patience == 0 {
            bail!(
                "epochs, batch_size and patience must all be >= 1 \
                 (epochs={}, batch_size={}, patience={})",
                self.epochs,
                self.batch_size,
                self.patience
            );
        }
        if self.hidden_sizes.is_empty() || self.hidden_sizes.contains(&0) {
            bail!("hidden_sizes must be non-empty with every width >= 1");
        }
        if self.lr <= 0.0 || !(0.0..=1.0).contains(&self.lr_decay) || self.lr_decay == 0.0 {
            bail!(
                "learning rate must be > 0 and lr_decay within (0, 1] \
                 (lr={}, lr_decay={})",
                self.lr,
                self.lr_decay
            );
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout {} must be within [0, 1)", self.dropout);
        }
        if self.weight_decay < 0.0 {
            bail!("weight decay {} must be >= 0", self.weight_decay);
        }
        Ok(())
    }
}

pub struct TrainUseCase {
    cfg: TrainConfig,
}

impl TrainUseCase {
    pub fn new(cfg: TrainConfig) -> Self {
        Self { cfg }
    }

    pub fn run(&self) -> Result<ModelMetadata> {
        let cfg = &self.cfg;
        cfg.validate()?;

        // ── Load + split ──────────────────────────────────────────────────────
        let lake = DataLake::new(cfg.lake_root.as_str());
        let examples = lake.read_training_table()?;
        if let Some(bad) = examples
            .iter()
            .find(|e| e.features.to_vector().len() != cfg.input_dim)
        {
            bail!(
                "customer {} has {} features but the model expects {} — \
                 processed layer and config disagree",
                bad.features.customer_id,
                bad.features.to_vector().len(),
                cfg.input_dim
            );
        }
        let split = stratified_split(
            examples,
            cfg.train_fraction,
            cfg.val_fraction,
            cfg.seed,
        )?;
        tracing::info!(
            "Split: {} train / {} validation / {} test",
            split.train.len(),
            split.validation.len(),
            split.test.len(),
        );

        // ── Scale — training statistics only ──────────────────────────────────
        let train_matrix: Vec<Vec<f64>> =
            split.train.iter().map(|e| e.features.to_vector()).collect();
        let scaler = StandardScaler::fit(&train_matrix)?;
        let train_samples = to_samples(&scaler, &split.train)?;
        let val_samples = to_samples(&scaler, &split.validation)?;
        let test_samples = to_samples(&scaler, &split.test)?;

        // ── Train ─────────────────────────────────────────────────────────────
        let history = TrainingHistory::begin(Path::new(cfg.models_dir.as_str()))?;
        let outcome = run_training(
            cfg,
            RetentionDataset::new(train_samples),
            RetentionDataset::new(val_samples),
            &history,
        )?;

        // ── Held-out evaluation ───────────────────────────────────────────────
        let metrics = evaluate_on(&outcome.model, &test_samples)?;
        println!(
            "Test metrics: auc={:.4} accuracy={:.4} precision={:.4} recall={:.4}",
            metrics.auc, metrics.accuracy, metrics.precision, metrics.recall,
        );

        // ── Persist artifacts ─────────────────────────────────────────────────
        let store = ArtifactStore::new(cfg.models_dir.as_str());
        store.save_model(&outcome.model)?;
        store.save_config(cfg)?;
        store.save_scaler(&scaler)?;

        let ranked = evaluation::rank_features(
            &FEATURE_NAMES,
            &outcome.model.input_weight_magnitudes()?,
        )?;
        store.save_feature_importance(&ranked)?;

        let metadata = ModelMetadata {
            trained_at: chrono::Utc::now().to_rfc3339(),
            best_epoch: outcome.best_epoch,
            epochs_run: outcome.epochs_run,
            metrics,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            config: cfg.clone(),
        };
        store.save_metadata(&metadata)?;
        tracing::info!("Artifacts written to '{}'", cfg.models_dir);
        Ok(metadata)
    }
}

fn to_samples(
    scaler: &StandardScaler,
    examples: &[TrainingExample],
) -> Result<Vec<RetentionSample>> {
    examples
        .iter()
        .map(|example| {
            let scaled = scaler.transform(&example.features.to_vector())?;
            Ok(RetentionSample {
                features: scaled.into_iter().map(|v| v as f32).collect(),
                label: f32::from(example.label),
            })
        })
        .collect()
}

/// Score the whole test partition in one forward pass and compute the
/// threshold-free and thresholded metrics.
fn evaluate_on(
    model: &crate::ml::model::RetentionNet<InferenceBackend>,
    test_samples: &[RetentionSample],
) -> Result<EvalMetrics> {
    use crate::data::batcher::RetentionBatcher;
    use burn::data::dataloader::batcher::Batcher;

    if test_samples.is_empty() {
        bail!("test partition is empty — nothing to evaluate");
    }
    let batcher = RetentionBatcher::<InferenceBackend>::new(Default::default());
    let batch = batcher.batch(test_samples.to_vec());
    let proba: Vec<f32> = model
        .forward_proba(batch.features)
        .into_data()
        .to_vec()
        .map_err(|e| anyhow::anyhow!("cannot read probabilities: {e:?}"))?;

    let scored: Vec<(f64, u8)> = proba
        .iter()
        .zip(test_samples)
        .map(|(p, s)| (*p as f64, u8::from(s.label > 0.5)))
        .collect();
    evaluation::evaluate(&scored)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{CustomerFeatures, RECENCY_SENTINEL_DAYS};
    use crate::ml::predictor::Predictor;

    /// Synthetic processed layer: recent buyers against never-buyers
    /// (sentinel recency, zero frequency), every other column filler.
    fn synthetic_examples(n: usize) -> Vec<TrainingExample> {
        (0..n)
            .map(|i| {
                let positive = i % 2 == 0;
                let mut values = vec![0.0; FEATURE_DIM];
                values[0] = if positive { 5.0 } else { RECENCY_SENTINEL_DAYS };
                values[1] = if positive { 12.0 } else { 0.0 }; // frequency
                values[7] = 30.0 + (i % 40) as f64; // age
                let features =
                    CustomerFeatures::from_vector(i as u32 + 1, &values).unwrap();
                TrainingExample { features, label: u8::from(positive) }
            })
            .collect()
    }

    fn quick_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            lake_root: dir.join("lake").display().to_string(),
            models_dir: dir.join("models").display().to_string(),
            hidden_sizes: vec![16, 8],
            dropout: 0.0,
            epochs: 8,
            batch_size: 16,
            patience: 8,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_validate_rejects_bad_knobs() {
        let cfg = TrainConfig { epochs: 0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { lr_decay: 0.0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { dropout: 1.0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_train_writes_loadable_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = quick_config(dir.path());

        let lake = DataLake::new(cfg.lake_root.as_str());
        lake.write_processed(&synthetic_examples(80)).unwrap();

        let metadata = TrainUseCase::new(cfg.clone()).run().unwrap();
        assert!(metadata.best_epoch >= 1);
        assert!(metadata.metrics.auc.is_finite());
        assert_eq!(metadata.feature_names.len(), FEATURE_DIM);

        // The artifact pair must load back for inference
        let predictor = Predictor::load(Path::new(cfg.models_dir.as_str())).unwrap();
        assert_eq!(predictor.feature_dim(), FEATURE_DIM);
        let p = predictor
            .predict_proba(&synthetic_examples(1)[0].features.to_vector())
            .unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    /// The toy scenario end to end: after training on recency-driven
    /// rows, a recent buyer must score at least as high as a customer
    /// with no purchase history at all.
    #[test]
    fn test_recent_buyer_outranks_never_buyer_after_training() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            epochs: 30,
            patience: 30,
            lr: 0.01,
            ..quick_config(dir.path())
        };
        let lake = DataLake::new(cfg.lake_root.as_str());
        lake.write_processed(&synthetic_examples(120)).unwrap();
        TrainUseCase::new(cfg.clone()).run().unwrap();

        let predictor = Predictor::load(Path::new(cfg.models_dir.as_str())).unwrap();
        let mut recent_buyer = vec![0.0; FEATURE_DIM];
        recent_buyer[0] = 5.0; // bought five days ago
        recent_buyer[1] = 12.0;
        recent_buyer[7] = 35.0;
        let mut never_buyer = vec![0.0; FEATURE_DIM];
        never_buyer[0] = RECENCY_SENTINEL_DAYS; // no history
        never_buyer[1] = 0.0;
        never_buyer[7] = 35.0;

        let p_recent = predictor.predict_proba(&recent_buyer).unwrap();
        let p_never = predictor.predict_proba(&never_buyer).unwrap();
        assert!(
            p_recent >= p_never,
            "recent buyer scored {p_recent:.4}, never-buyer {p_never:.4}"
        );
    }

    #[test]
    fn test_width_mismatch_fails_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { input_dim: 5, ..quick_config(dir.path()) };
        let lake = DataLake::new(cfg.lake_root.as_str());
        lake.write_processed(&synthetic_examples(40)).unwrap();
        assert!(TrainUseCase::new(cfg).run().is_err());
    }
}
