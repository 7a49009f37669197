// ============================================================
// Layer 4 — Categorical Encoder
// ============================================================
// Maps string categories to stable integer codes, fitted once on
// the stage layer and persisted so inference-time encoding matches
// training-time encoding EXACTLY.
//
// Codes are assigned in sorted order of the distinct values, which
// makes fitting deterministic regardless of row order. Transforming
// a value the encoder never saw is an explicit error — silently
// inventing a code would feed the model a feature distribution it
// was never trained on.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::domain::traits::Persistable;

/// One fitted string → code mapping for a single column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    /// Column name, kept for error messages and artifact readability.
    pub column: String,
    /// Sorted category → code table. BTreeMap keeps the JSON artifact
    /// ordered, so diffs between runs are readable.
    pub codes: BTreeMap<String, u32>,
}

impl CategoricalEncoder {
    /// Fit on the distinct values of one column. Codes run 0..n in
    /// sorted value order.
    pub fn fit<'a>(column: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut distinct: Vec<&str> = values.into_iter().collect();
        distinct.sort_unstable();
        distinct.dedup();

        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code as u32))
            .collect();

        Self { column: column.to_string(), codes }
    }

    /// Encode one value. Unfitted values fail loudly (inference-error
    /// class of the taxonomy).
    pub fn transform(&self, value: &str) -> Result<u32> {
        match self.codes.get(value) {
            Some(&code) => Ok(code),
            None => bail!(
                "value '{}' was never fitted for column '{}' \
                 ({} known categories)",
                value,
                self.column,
                self.codes.len()
            ),
        }
    }

    pub fn n_categories(&self) -> usize {
        self.codes.len()
    }
}

/// The full encoder set for one pipeline run, persisted as a single
/// encoders.json in the processed layer. The query agent loads this
/// snapshot read-only and never refits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderSet {
    pub gender: CategoricalEncoder,
    pub preferred_category: CategoricalEncoder,
    pub payment_method: CategoricalEncoder,
}

impl Persistable for EncoderSet {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("cannot write encoders to '{}'", path.display()))?;
        tracing::debug!("Saved encoder set to '{}'", path.display());
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| {
            format!(
                "cannot read encoders from '{}' — has the features stage run?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_sorted_and_dense() {
        let enc = CategoricalEncoder::fit("gender", ["male", "female", "male", "other"]);
        assert_eq!(enc.transform("female").unwrap(), 0);
        assert_eq!(enc.transform("male").unwrap(), 1);
        assert_eq!(enc.transform("other").unwrap(), 2);
        assert_eq!(enc.n_categories(), 3);
    }

    #[test]
    fn test_fit_is_order_independent() {
        let a = CategoricalEncoder::fit("c", ["x", "y", "z"]);
        let b = CategoricalEncoder::fit("c", ["z", "x", "y", "x"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unfitted_value_is_an_error() {
        let enc = CategoricalEncoder::fit("payment_method", ["paypal"]);
        let err = enc.transform("wire").unwrap_err();
        assert!(err.to_string().contains("payment_method"));
    }

    #[test]
    fn test_round_trips_through_json() {
        let set = EncoderSet {
            gender: CategoricalEncoder::fit("gender", ["female", "male"]),
            preferred_category: CategoricalEncoder::fit("preferred_category", ["Books"]),
            payment_method: CategoricalEncoder::fit("payment_method", ["paypal", "cash"]),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoders.json");
        set.save(&path).unwrap();
        let loaded = EncoderSet::load(&path).unwrap();
        assert_eq!(set, loaded);
    }
}
