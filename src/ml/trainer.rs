// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Key decisions:
//   - Training uses Autodiff<NdArray> for gradients; validation
//     runs on the inner backend via model.valid(), which also
//     disables dropout and switches batch-norm to running stats
//   - L2 regularisation comes in through Adam's weight decay
//   - The learning rate decays exponentially per epoch and is
//     passed to optim.step each batch
//   - Class imbalance is countered by weighting the BCE terms with
//     inverse label frequencies from the TRAINING partition
//   - Early stopping watches validation loss with a patience
//     budget; the weights kept are those of the best epoch, not
//     the last one
//   - A NaN/∞ loss aborts the run immediately with diagnostics —
//     a failed run must never leave a corrupt artifact behind
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::RetentionBatcher, dataset::RetentionDataset};
use crate::infra::metrics::{EpochMetrics, TrainingHistory};
use crate::ml::evaluation;
use crate::ml::model::{RetentionNet, RetentionNetConfig};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type InferenceBackend = burn::backend::NdArray;

/// What a successful run hands back to the use case: the best-epoch
/// model (on the inference backend) plus the run's shape.
pub struct TrainingOutcome {
    pub model: RetentionNet<InferenceBackend>,
    pub best_epoch: usize,
    pub epochs_run: usize,
    pub best_val_loss: f64,
}

/// Inverse-frequency class weights from the training partition:
/// w_class = n / (2 · n_class), so the weighted positive and
/// negative masses match regardless of the imbalance ratio.
pub fn class_weights(total: usize, positives: usize) -> Result<(f64, f64)> {
    let negatives = total - positives;
    if positives == 0 || negatives == 0 {
        bail!(
            "training partition is single-class ({positives} positives out of \
             {total}) — cannot weight the loss, aborting"
        );
    }
    let weight_negative = total as f64 / (2.0 * negatives as f64);
    let weight_positive = total as f64 / (2.0 * positives as f64);
    Ok((weight_negative, weight_positive))
}

pub fn run_training(
    cfg: &TrainConfig,
    train_dataset: RetentionDataset,
    val_dataset: RetentionDataset,
    history: &TrainingHistory,
) -> Result<TrainingOutcome> {
    use burn::data::dataset::Dataset;

    let device = burn::backend::ndarray::NdArrayDevice::default();

    let (weight_negative, weight_positive) =
        class_weights(train_dataset.len(), train_dataset.positives())?;
    tracing::info!(
        "Class weights: negative={:.3}, positive={:.3}",
        weight_negative,
        weight_positive,
    );

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg =
        RetentionNetConfig::new(cfg.input_dim, cfg.hidden_sizes.clone(), cfg.dropout);
    let mut model: RetentionNet<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} inputs → {:?} → 1",
        cfg.input_dim,
        cfg.hidden_sizes,
    );

    // ── Adam optimiser (weight decay = L2 regularisation) ─────────────────────
    // m = β1·m + (1−β1)·g        (mean)
    // v = β2·v + (1−β2)·g²       (variance)
    // θ = θ − lr · m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay)));
    let mut optim = optim_cfg.init();

    // ── Training data loader (autodiff backend) ───────────────────────────────
    let train_batcher = RetentionBatcher::<TrainBackend>::new(device);
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (inner backend — no autodiff overhead) ─────────
    let val_batcher = RetentionBatcher::<InferenceBackend>::new(device);
    let val_loader = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch = 0usize;
    let mut best_model: Option<RetentionNet<InferenceBackend>> = None;
    let mut epochs_without_improvement = 0usize;
    let mut epochs_run = 0usize;

    for epoch in 1..=cfg.epochs {
        epochs_run = epoch;
        let learning_rate = cfg.lr * cfg.lr_decay.powi(epoch as i32 - 1);

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches = 0usize;

        for batch in train_loader.iter() {
            let loss = model.forward_loss(
                batch.features,
                batch.targets,
                weight_negative,
                weight_positive,
            );

            let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_value.is_finite() {
                bail!(
                    "non-finite training loss {loss_value} at epoch {epoch} \
                     batch {train_batches} (lr={learning_rate:.6}) — aborting \
                     without writing an artifact"
                );
            }
            train_loss_sum += loss_value;
            train_batches += 1;

            // Backward pass + Adam update at the decayed rate
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(learning_rate, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else {
            f64::NAN
        };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → RetentionNet<InferenceBackend>:
        // dropout off, batch-norm on running statistics
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches = 0usize;
        let mut scored: Vec<(f64, u8)> = Vec::new();

        for batch in val_loader.iter() {
            let loss = model_valid.forward_loss(
                batch.features.clone(),
                batch.targets.clone(),
                weight_negative,
                weight_positive,
            );
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches += 1;

            let proba: Vec<f32> = model_valid
                .forward_proba(batch.features)
                .into_data()
                .to_vec()
                .map_err(|e| anyhow::anyhow!("cannot read probabilities: {e:?}"))?;
            let labels: Vec<f32> = batch
                .targets
                .into_data()
                .to_vec()
                .map_err(|e| anyhow::anyhow!("cannot read targets: {e:?}"))?;
            scored.extend(
                proba
                    .iter()
                    .zip(&labels)
                    .map(|(p, y)| (*p as f64, u8::from(*y > 0.5))),
            );
        }

        let avg_val_loss = if val_batches > 0 {
            val_loss_sum / val_batches as f64
        } else {
            f64::NAN
        };
        if !avg_val_loss.is_finite() {
            bail!("non-finite validation loss at epoch {epoch} — aborting");
        }
        let val_auc = match evaluation::evaluate(&scored) {
            Ok(metrics) => metrics.auc,
            // A single-class validation slice has no defined AUC;
            // early stopping runs on the loss, so record 0.5 and go on
            Err(_) => {
                tracing::warn!(
                    "validation partition is single-class — recording AUC 0.5"
                );
                0.5
            }
        };

        let metrics = EpochMetrics {
            epoch,
            train_loss: avg_train_loss,
            val_loss: avg_val_loss,
            val_auc,
            learning_rate,
        };
        history.log(&metrics)?;
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_auc={:.4} | lr={:.6}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, val_auc, learning_rate,
        );

        // ── Early stopping bookkeeping ────────────────────────────────────────
        if metrics.is_improvement(best_val_loss) {
            best_val_loss = avg_val_loss;
            best_epoch = epoch;
            best_model = Some(model.valid());
            epochs_without_improvement = 0;
        } else {
            epochs_without_improvement += 1;
            if epochs_without_improvement >= cfg.patience {
                tracing::info!(
                    "Early stop at epoch {} (no improvement for {} epochs, \
                     best val_loss {:.4} at epoch {})",
                    epoch,
                    epochs_without_improvement,
                    best_val_loss,
                    best_epoch,
                );
                break;
            }
        }
    }

    let model = match best_model {
        Some(model) => model,
        None => bail!("training produced no usable epoch — aborting"),
    };
    tracing::info!(
        "Training complete: best epoch {} of {} (val_loss {:.4})",
        best_epoch,
        epochs_run,
        best_val_loss,
    );

    Ok(TrainingOutcome { model, best_epoch, epochs_run, best_val_loss })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::RetentionSample;

    fn config() -> TrainConfig {
        TrainConfig {
            input_dim: 2,
            hidden_sizes: vec![8],
            epochs: 40,
            batch_size: 8,
            lr: 0.01,
            lr_decay: 0.98,
            dropout: 0.0,
            weight_decay: 1e-5,
            patience: 40,
            seed: 42,
            ..TrainConfig::default()
        }
    }

    /// Cleanly separable toy data: positive class clusters at +1,
    /// negative at −1 on the first axis.
    fn separable(n: usize) -> Vec<RetentionSample> {
        (0..n)
            .map(|i| {
                let positive = i % 2 == 0;
                let x = if positive { 1.0 } else { -1.0 };
                let jitter = (i % 7) as f32 * 0.01;
                RetentionSample {
                    features: vec![x + jitter, -x],
                    label: f32::from(u8::from(positive)),
                }
            })
            .collect()
    }

    #[test]
    fn test_class_weights_balance_the_classes() {
        let (wn, wp) = class_weights(100, 20).unwrap();
        assert!((wn * 80.0 - wp * 20.0).abs() < 1e-9);
        assert!(wp > wn);
    }

    #[test]
    fn test_class_weights_reject_single_class() {
        assert!(class_weights(10, 0).is_err());
        assert!(class_weights(10, 10).is_err());
    }

    #[test]
    fn test_training_learns_separable_data() {
        let dir = tempfile::tempdir().unwrap();
        let history = TrainingHistory::begin(dir.path()).unwrap();
        let outcome = run_training(
            &config(),
            RetentionDataset::new(separable(48)),
            RetentionDataset::new(separable(16)),
            &history,
        )
        .unwrap();

        assert!(outcome.best_epoch >= 1);
        assert!(outcome.best_val_loss.is_finite());

        // Sanity check on the learned direction: the positive-cluster
        // probe must outrank the negative-cluster probe.
        let device = Default::default();
        let probes = Tensor::<InferenceBackend, 2>::from_floats(
            [[1.0, -1.0], [-1.0, 1.0]],
            &device,
        );
        let proba: Vec<f32> = outcome
            .model
            .forward_proba(probes)
            .into_data()
            .to_vec()
            .unwrap();
        assert!(proba[0] > proba[1]);
    }
}
