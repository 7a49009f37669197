// ============================================================
// Layer 5 — Predictor
// ============================================================
// Loads the persisted model + scaler pair and turns raw feature
// vectors into repurchase probabilities. Inference runs on the
// plain NdArray backend — no autodiff, dropout disabled.
//
// The scaler travels with the model: scoring a raw vector with a
// model trained on standardised inputs would silently produce
// garbage, so the two are loaded as one unit or not at all.

use std::path::Path;

use anyhow::{bail, Context, Result};
use burn::prelude::*;

use crate::data::scaler::StandardScaler;
use crate::infra::checkpoint::ArtifactStore;
use crate::ml::model::RetentionNet;
use crate::ml::trainer::InferenceBackend;

pub struct Predictor {
    model: RetentionNet<InferenceBackend>,
    scaler: StandardScaler,
    device: <InferenceBackend as Backend>::Device,
}

impl Predictor {
    /// Load model weights, architecture config and scaler from a
    /// trained artifact directory.
    pub fn load(models_dir: &Path) -> Result<Self> {
        let store = ArtifactStore::new(models_dir);
        let device = Default::default();
        let model = store
            .load_model::<InferenceBackend>(&device)
            .with_context(|| format!("no trained model under {}", models_dir.display()))?;
        let scaler = store.load_scaler()?;
        Ok(Self { model, scaler, device })
    }

    pub fn feature_dim(&self) -> usize {
        self.scaler.dim()
    }

    /// Probability of a repurchase within the horizon for one raw
    /// (unscaled) feature vector.
    pub fn predict_proba(&self, raw: &[f64]) -> Result<f64> {
        let scores = self.predict_batch(&[raw.to_vec()])?;
        match scores.first() {
            Some(p) => Ok(*p),
            None => bail!("predictor returned no score for a single row"),
        }
    }

    /// Score many raw feature vectors in one forward pass.
    /// Row order is preserved.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let dim = self.scaler.dim();
        let scaled = self.scaler.transform_all(rows)?;

        let flat: Vec<f32> = scaled
            .iter()
            .flat_map(|row| row.iter().map(|v| *v as f32))
            .collect();
        let features = Tensor::<InferenceBackend, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([rows.len(), dim]);

        let proba: Vec<f32> = self
            .model
            .forward_proba(features)
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("cannot read probabilities: {e:?}"))?;
        Ok(proba.into_iter().map(f64::from).collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::model::RetentionNetConfig;

    fn store_with_artifacts(dir: &Path) -> ArtifactStore {
        let store = ArtifactStore::new(dir);
        let cfg = TrainConfig {
            models_dir: dir.display().to_string(),
            input_dim: 3,
            hidden_sizes: vec![8, 4],
            ..TrainConfig::default()
        };
        let device = Default::default();
        let model: RetentionNet<InferenceBackend> =
            RetentionNetConfig::new(3, vec![8, 4], 0.0).init(&device);
        store.save_model(&model).unwrap();
        store.save_config(&cfg).unwrap();

        let scaler =
            StandardScaler::fit(&[vec![1.0, 2.0, 3.0], vec![3.0, 6.0, 9.0]]).unwrap();
        store.save_scaler(&scaler).unwrap();
        store
    }

    #[test]
    fn test_load_then_score() {
        let dir = tempfile::tempdir().unwrap();
        store_with_artifacts(dir.path());

        let predictor = Predictor::load(dir.path()).unwrap();
        assert_eq!(predictor.feature_dim(), 3);

        let p = predictor.predict_proba(&[2.0, 4.0, 6.0]).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_batch_matches_single_row_scores() {
        let dir = tempfile::tempdir().unwrap();
        store_with_artifacts(dir.path());
        let predictor = Predictor::load(dir.path()).unwrap();

        let rows = vec![vec![1.0, 2.0, 3.0], vec![3.0, 6.0, 9.0]];
        let batch = predictor.predict_batch(&rows).unwrap();
        for (row, expected) in rows.iter().zip(&batch) {
            let single = predictor.predict_proba(row).unwrap();
            assert!((single - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_artifacts_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Predictor::load(dir.path()).is_err());
    }
}
