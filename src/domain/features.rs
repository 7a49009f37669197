// ============================================================
// Layer 3 — Customer Feature Row
// ============================================================
// One row per customer, derived by aggregating that customer's
// transactions up to the as-of date. Recomputed wholesale each
// pipeline run — there is no incremental update.
//
// The column ORDER here is load-bearing: the scaler, the model's
// input layer and the persisted feature-importance ranking all
// index into the vector produced by `to_vector()`. FEATURE_NAMES
// is the single source of truth for that order and is persisted
// into the model metadata so a reader can line artifacts up.

use serde::{Deserialize, Serialize};

/// Recency assigned to a customer with no purchase history before the
/// as-of date. Ten years in days — far beyond any real recency the
/// simulator can produce, so the model sees "never bought" as the
/// extreme of the recency axis rather than a hole in the data.
pub const RECENCY_SENTINEL_DAYS: f64 = 3650.0;

/// The fixed product-category vocabulary, alphabetical. The simulator
/// draws from this list and the feature builder emits one spend-share
/// column per entry, so the two must never drift apart.
pub const CATEGORIES: [&str; 6] = [
    "Beauty",
    "Books",
    "Clothing",
    "Electronics",
    "Home & Garden",
    "Sports",
];

/// Number of input features the model consumes.
pub const FEATURE_DIM: usize = 21;

/// Feature names in vector order (see `CustomerFeatures::to_vector`).
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "recency_days",
    "frequency",
    "monetary_total",
    "monetary_avg",
    "avg_quantity",
    "distinct_products",
    "tenure_days",
    "age",
    "gender_code",
    "preferred_category_code",
    "payment_method_code",
    "share_beauty",
    "share_books",
    "share_clothing",
    "share_electronics",
    "share_home_garden",
    "share_sports",
    "q1_share",
    "q2_share",
    "q3_share",
    "q4_share",
];

/// The engineered feature row for one customer.
///
/// RFM core:
///   - recency_days:   as_of − last completed purchase date
///   - frequency:      completed purchase count before as_of
///   - monetary_total: sum of completed purchase amounts
///
/// Plus behavioural aggregates, encoded categoricals, per-category
/// spend shares and per-quarter purchase shares (a cheap seasonality
/// signal: which part of the year this customer buys in).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub customer_id: u32,
    pub recency_days: f64,
    pub frequency: f64,
    pub monetary_total: f64,
    pub monetary_avg: f64,
    pub avg_quantity: f64,
    pub distinct_products: f64,
    pub tenure_days: f64,
    pub age: f64,
    pub gender_code: f64,
    pub preferred_category_code: f64,
    pub payment_method_code: f64,
    pub share_beauty: f64,
    pub share_books: f64,
    pub share_clothing: f64,
    pub share_electronics: f64,
    pub share_home_garden: f64,
    pub share_sports: f64,
    pub q1_share: f64,
    pub q2_share: f64,
    pub q3_share: f64,
    pub q4_share: f64,
}

impl CustomerFeatures {
    /// Flatten into the model input vector, in FEATURE_NAMES order.
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.recency_days,
            self.frequency,
            self.monetary_total,
            self.monetary_avg,
            self.avg_quantity,
            self.distinct_products,
            self.tenure_days,
            self.age,
            self.gender_code,
            self.preferred_category_code,
            self.payment_method_code,
            self.share_beauty,
            self.share_books,
            self.share_clothing,
            self.share_electronics,
            self.share_home_garden,
            self.share_sports,
            self.q1_share,
            self.q2_share,
            self.q3_share,
            self.q4_share,
        ]
    }

    /// Rebuild a row from a vector in FEATURE_NAMES order — the exact
    /// inverse of `to_vector`. Fails on a width mismatch rather than
    /// guessing at column alignment.
    pub fn from_vector(customer_id: u32, values: &[f64]) -> anyhow::Result<Self> {
        if values.len() != FEATURE_DIM {
            anyhow::bail!(
                "feature vector for customer {} has {} values, expected {}",
                customer_id,
                values.len(),
                FEATURE_DIM
            );
        }
        Ok(Self {
            customer_id,
            recency_days: values[0],
            frequency: values[1],
            monetary_total: values[2],
            monetary_avg: values[3],
            avg_quantity: values[4],
            distinct_products: values[5],
            tenure_days: values[6],
            age: values[7],
            gender_code: values[8],
            preferred_category_code: values[9],
            payment_method_code: values[10],
            share_beauty: values[11],
            share_books: values[12],
            share_clothing: values[13],
            share_electronics: values[14],
            share_home_garden: values[15],
            share_sports: values[16],
            q1_share: values[17],
            q2_share: values[18],
            q3_share: values[19],
            q4_share: values[20],
        })
    }

    /// True if the customer had at least one completed purchase
    /// before the as-of date.
    pub fn has_history(&self) -> bool {
        self.frequency > 0.0
    }
}

/// A feature row paired with its binary repurchase label.
/// label = 1 iff the customer completed ≥1 purchase strictly after
/// the as-of date within the prediction horizon.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub features: CustomerFeatures,
    pub label: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_matches_feature_dim() {
        let row = zero_row(7);
        assert_eq!(row.to_vector().len(), FEATURE_DIM);
        assert_eq!(FEATURE_NAMES.len(), FEATURE_DIM);
    }

    #[test]
    fn test_category_shares_cover_vocabulary() {
        // One share_* column per catalog category, same order
        let share_names: Vec<&str> = FEATURE_NAMES
            .iter()
            .filter(|n| n.starts_with("share_"))
            .copied()
            .collect();
        assert_eq!(share_names.len(), CATEGORIES.len());
    }

    #[test]
    fn test_vector_round_trip() {
        let mut row = zero_row(42);
        row.recency_days = 12.0;
        row.monetary_total = 310.55;
        row.q3_share = 0.4;
        let rebuilt =
            CustomerFeatures::from_vector(row.customer_id, &row.to_vector()).unwrap();
        assert_eq!(rebuilt.recency_days, 12.0);
        assert_eq!(rebuilt.monetary_total, 310.55);
        assert_eq!(rebuilt.q3_share, 0.4);
        assert!(CustomerFeatures::from_vector(1, &[0.0; 3]).is_err());
    }

    #[test]
    fn test_has_history() {
        let mut row = zero_row(1);
        assert!(!row.has_history());
        row.frequency = 3.0;
        assert!(row.has_history());
    }

    fn zero_row(customer_id: u32) -> CustomerFeatures {
        CustomerFeatures {
            customer_id,
            recency_days: RECENCY_SENTINEL_DAYS,
            frequency: 0.0,
            monetary_total: 0.0,
            monetary_avg: 0.0,
            avg_quantity: 0.0,
            distinct_products: 0.0,
            tenure_days: 0.0,
            age: 0.0,
            gender_code: 0.0,
            preferred_category_code: 0.0,
            payment_method_code: 0.0,
            share_beauty: 0.0,
            share_books: 0.0,
            share_clothing: 0.0,
            share_electronics: 0.0,
            share_home_garden: 0.0,
            share_sports: 0.0,
            q1_share: 0.0,
            q2_share: 0.0,
            q3_share: 0.0,
            q4_share: 0.0,
        }
    }
}
