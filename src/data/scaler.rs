// ============================================================
// Layer 4 — Standard Scaler
// ============================================================
// Per-feature standardisation: z = (x − mean) / std.
//
// The scaler is fit on the TRAINING partition only and then applied
// to validation, test and every inference-time vector. Fitting on
// the full table would leak validation/test statistics into
// training — the same leakage boundary the as-of date enforces for
// labels, applied to feature scale.
//
// A constant feature (std = 0) maps to 0 rather than dividing by
// zero; its column carries no information either way.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::domain::traits::Persistable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and (population) standard deviation on the
    /// training rows. Every row must have the same width.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            bail!("cannot fit a scaler on zero rows");
        };
        let dim = first.len();
        if rows.iter().any(|r| r.len() != dim) {
            bail!("inconsistent feature widths while fitting scaler");
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; dim];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut vars = vec![0.0; dim];
        for row in rows {
            for ((v, x), m) in vars.iter_mut().zip(row).zip(&means) {
                let d = x - m;
                *v += d * d;
            }
        }
        let stds = vars.into_iter().map(|v| (v / n).sqrt()).collect();

        Ok(Self { means, stds })
    }

    /// Standardise one feature vector. A width mismatch is a schema
    /// error and fails loudly.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            bail!(
                "feature vector has {} values but the scaler was fitted on {}",
                row.len(),
                self.means.len()
            );
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(x, (mean, std))| if *std > 0.0 { (x - mean) / std } else { 0.0 })
            .collect())
    }

    /// Standardise a whole matrix.
    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }
}

impl Persistable for StandardScaler {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("cannot write scaler to '{}'", path.display()))?;
        tracing::debug!("Saved scaler ({} features) to '{}'", self.dim(), path.display());
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| {
            format!(
                "cannot read scaler from '{}' — has the train stage run?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}
