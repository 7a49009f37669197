// ============================================================
// Layer 2 — Pipeline Use Case
// ============================================================
// simulate → clean → features → train, sequentially. Each stage
// reads only what the previous one wrote to the lake, so running
// them back to back is exactly equivalent to running the four
// commands by hand.

use anyhow::Result;

use crate::application::clean_use_case::CleanUseCase;
use crate::application::features_use_case::{FeaturesConfig, FeaturesUseCase};
use crate::application::simulate_use_case::SimulateUseCase;
use crate::application::train_use_case::{TrainConfig, TrainUseCase};
use crate::data::simulator::SimConfig;
use crate::infra::checkpoint::ModelMetadata;

pub struct PipelineUseCase {
    pub sim: SimConfig,
    pub features: FeaturesConfig,
    pub train: TrainConfig,
}

impl PipelineUseCase {
    pub fn run(&self) -> Result<ModelMetadata> {
        let lake_root = self.features.lake_root.as_str();

        tracing::info!("Pipeline stage 1/4: simulate");
        SimulateUseCase::new(lake_root, self.sim.clone()).run()?;

        tracing::info!("Pipeline stage 2/4: clean");
        CleanUseCase::new(lake_root).run()?;

        tracing::info!("Pipeline stage 3/4: features");
        FeaturesUseCase::new(self.features.clone()).run()?;

        tracing::info!("Pipeline stage 4/4: train");
        let metadata = TrainUseCase::new(self.train.clone()).run()?;

        println!(
            "Pipeline complete: best epoch {} of {}, test AUC {:.4}",
            metadata.best_epoch, metadata.epochs_run, metadata.metrics.auc,
        );
        Ok(metadata)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::query_use_case::QueryUseCase;
    use crate::domain::traits::RetentionScorer;
    use std::path::Path;

    /// The whole pipeline end to end on a small seeded world, then a
    /// query against the artifacts it produced.
    #[test]
    fn test_pipeline_end_to_end_then_query() {
        let dir = tempfile::tempdir().unwrap();
        let lake_root = dir.path().join("lake").display().to_string();
        let models_dir = dir.path().join("models").display().to_string();

        let pipeline = PipelineUseCase {
            sim: SimConfig {
                customers: 60,
                products: 20,
                transactions: 1_500,
                ..SimConfig::default()
            },
            features: FeaturesConfig {
                lake_root: lake_root.clone(),
                as_of: None,
                horizon_days: 30,
            },
            train: TrainConfig {
                lake_root: lake_root.clone(),
                models_dir: models_dir.clone(),
                hidden_sizes: vec![16, 8],
                dropout: 0.0,
                epochs: 5,
                batch_size: 16,
                patience: 5,
                ..TrainConfig::default()
            },
        };
        let metadata = pipeline.run().unwrap();
        assert!(metadata.metrics.auc.is_finite());

        let agent = QueryUseCase::load(&lake_root, Path::new(&models_dir)).unwrap();
        let top = agent.top_n(5).unwrap();
        assert_eq!(top.len(), 5);
        let first = top[0].0;
        let p = agent.probability(first).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
