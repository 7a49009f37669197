// ============================================================
// Layer 2 — Query Use Case
// ============================================================
// The read-only serving side. Loads the trained model, its scaler,
// the fitted encoders and the processed feature snapshot exactly
// once, then answers probability queries from memory. Nothing here
// refits or mutates an artifact.
//
// An unknown customer id is an explicit error, never a default
// probability — a silent 0.0 for a typo'd id would be worse than
// the failure.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::data::encoder::EncoderSet;
use crate::domain::features::CustomerFeatures;
use crate::domain::traits::{Persistable, RetentionScorer};
use crate::infra::lake::DataLake;
use crate::ml::predictor::Predictor;

pub struct QueryUseCase {
    predictor: Predictor,
    /// customer_id → raw feature vector, ascending id order.
    rows: BTreeMap<u32, Vec<f64>>,
}

impl QueryUseCase {
    pub fn load(lake_root: &str, models_dir: &Path) -> Result<Self> {
        let lake = DataLake::new(lake_root);
        let predictor = Predictor::load(models_dir)?;
        let encoders = EncoderSet::load(&lake.encoders_path())?;

        let mut rows = BTreeMap::new();
        for row in lake.read_feature_rows()? {
            check_codes(&row, &encoders)?;
            let vector = row.to_vector();
            if vector.len() != predictor.feature_dim() {
                bail!(
                    "customer {} has {} features but the scaler was fitted on {} — \
                     snapshot and artifacts disagree, re-run the features and \
                     train stages together",
                    row.customer_id,
                    vector.len(),
                    predictor.feature_dim()
                );
            }
            rows.insert(row.customer_id, vector);
        }
        if rows.is_empty() {
            bail!("processed snapshot has no customers — has the features stage run?");
        }
        tracing::info!("Query agent ready: {} scorable customers", rows.len());
        Ok(Self { predictor, rows })
    }

    pub fn customer_count(&self) -> usize {
        self.rows.len()
    }
}

/// A code outside the fitted range means the snapshot was built with
/// different encoders than the ones on disk.
fn check_codes(row: &CustomerFeatures, encoders: &EncoderSet) -> Result<()> {
    let checks = [
        ("gender", row.gender_code, encoders.gender.n_categories()),
        (
            "preferred_category",
            row.preferred_category_code,
            encoders.preferred_category.n_categories(),
        ),
        (
            "payment_method",
            row.payment_method_code,
            encoders.payment_method.n_categories(),
        ),
    ];
    for (column, code, n) in checks {
        if code < 0.0 || code >= n as f64 {
            bail!(
                "customer {}: {column} code {code} is outside the fitted range \
                 0..{n} — snapshot and encoders disagree",
                row.customer_id
            );
        }
    }
    Ok(())
}

impl RetentionScorer for QueryUseCase {
    fn probability(&self, customer_id: u32) -> Result<f64> {
        let Some(vector) = self.rows.get(&customer_id) else {
            bail!(
                "unknown customer id {customer_id} — the snapshot covers {} \
                 customers, ids {}..={}",
                self.rows.len(),
                self.rows.keys().next().copied().unwrap_or(0),
                self.rows.keys().next_back().copied().unwrap_or(0),
            );
        };
        self.predictor.predict_proba(vector)
    }

    fn top_n(&self, n: usize) -> Result<Vec<(u32, f64)>> {
        let ids: Vec<u32> = self.rows.keys().copied().collect();
        let vectors: Vec<Vec<f64>> = self.rows.values().cloned().collect();
        let scores = self.predictor.predict_batch(&vectors)?;

        let mut ranked: Vec<(u32, f64)> = ids.into_iter().zip(scores).collect();
        // Stable sort on descending probability; the input is already in
        // ascending id order, so ties keep the smaller id first.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        Ok(ranked)
    }
}
