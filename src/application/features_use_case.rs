// ============================================================
// Layer 2 — Features Use Case
// ============================================================
// Stage layer in, processed layer out: one RFM feature row plus a
// binary repurchase label per customer, with the categorical
// encoders fitted here and persisted next to the features.
//
// When no as-of date is given, it defaults to
//   max(transaction date) − horizon
// so the label window sits fully inside the observed data instead
// of hanging over its edge (which would label every customer 0).

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};

use crate::data::features::{fit_encoders, FeatureBuilder, FeatureParams};
use crate::domain::entities::Transaction;
use crate::domain::traits::Persistable;
use crate::infra::lake::DataLake;

#[derive(Debug, Clone)]
pub struct FeaturesConfig {
    pub lake_root: String,
    /// Feature cutoff; defaults to max(txn date) − horizon when None.
    pub as_of: Option<NaiveDate>,
    pub horizon_days: i64,
}

/// What one features run produced, for logging and tests.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRunSummary {
    pub as_of: NaiveDate,
    pub rows: usize,
    pub positives: usize,
}

pub struct FeaturesUseCase {
    cfg: FeaturesConfig,
    lake: DataLake,
}

impl FeaturesUseCase {
    pub fn new(cfg: FeaturesConfig) -> Self {
        let lake = DataLake::new(cfg.lake_root.as_str());
        Self { cfg, lake }
    }

    pub fn run(&self) -> Result<FeatureRunSummary> {
        let (customers, products, transactions) = self.lake.read_stage()?;

        let as_of = match self.cfg.as_of {
            Some(date) => date,
            None => default_as_of(&transactions, self.cfg.horizon_days)?,
        };
        let params = FeatureParams { as_of, horizon_days: self.cfg.horizon_days };
        tracing::info!(
            "Feature cutoff {} with a {}-day repurchase horizon",
            as_of,
            self.cfg.horizon_days,
        );

        let encoders = fit_encoders(&customers, &transactions);
        let builder = FeatureBuilder::new(&encoders, &products, params)?;
        let examples = builder.build(&customers, &transactions)?;

        self.lake.write_processed(&examples)?;
        encoders.save(&self.lake.encoders_path())?;

        let positives = examples.iter().filter(|e| e.label == 1).count();
        let summary =
            FeatureRunSummary { as_of, rows: examples.len(), positives };
        println!(
            "Processed layer written: {} customers, {} positive labels ({:.1}%)",
            summary.rows,
            summary.positives,
            100.0 * summary.positives as f64 / summary.rows.max(1) as f64,
        );
        Ok(summary)
    }
}

/// Latest completed-or-not transaction date minus the horizon; with no
/// transactions at all there is nothing to label and the run fails.
fn default_as_of(transactions: &[Transaction], horizon_days: i64) -> Result<NaiveDate> {
    match transactions.iter().map(|t| t.date).max() {
        Some(last) => Ok(last - Duration::days(horizon_days)),
        None => bail!("stage layer has no transactions — cannot derive an as-of date"),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clean_use_case::CleanUseCase;
    use crate::application::simulate_use_case::SimulateUseCase;
    use crate::data::encoder::EncoderSet;
    use crate::data::simulator::SimConfig;
    use crate::domain::features::FEATURE_DIM;

    fn seeded_lake(root: &str) {
        let cfg = SimConfig {
            customers: 40,
            products: 15,
            transactions: 400,
            ..SimConfig::default()
        };
        SimulateUseCase::new(root, cfg).run().unwrap();
        CleanUseCase::new(root).run().unwrap();
    }

    #[test]
    fn test_features_cover_every_stage_customer() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        seeded_lake(&root);

        let summary = FeaturesUseCase::new(FeaturesConfig {
            lake_root: root.clone(),
            as_of: None,
            horizon_days: 30,
        })
        .run()
        .unwrap();

        let lake = DataLake::new(&root);
        let (customers, _, _) = lake.read_stage().unwrap();
        assert_eq!(summary.rows, customers.len());

        let rows = lake.read_feature_rows().unwrap();
        assert_eq!(rows.len(), customers.len());
        assert!(rows.iter().all(|r| r.to_vector().len() == FEATURE_DIM));

        // Encoders must be on disk for the train and query stages
        EncoderSet::load(&lake.encoders_path()).unwrap();
    }

    #[test]
    fn test_default_as_of_sits_one_horizon_before_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        seeded_lake(&root);

        let summary = FeaturesUseCase::new(FeaturesConfig {
            lake_root: root.clone(),
            as_of: None,
            horizon_days: 30,
        })
        .run()
        .unwrap();

        let (_, _, transactions) = DataLake::new(&root).read_stage().unwrap();
        let last = transactions.iter().map(|t| t.date).max().unwrap();
        assert_eq!(summary.as_of, last - Duration::days(30));
    }
}
