// ============================================================
// Layer 4 — Feature Engineering
// ============================================================
// Aggregates each customer's transaction history into one feature
// row plus a binary repurchase label.
//
// The as-of date is THE leakage boundary of the whole pipeline:
//
//   features ← completed transactions with date <= as_of
//   label    ← completed transactions with as_of < date <= as_of + horizon
//
// Nothing from the label window may ever reach a feature, and the
// boundary is an explicit parameter rather than an implicit "now"
// so it cannot silently drift between runs.
//
// Edge case honoured throughout: a customer with zero completed
// purchases before the as-of date gets well-defined defaults
// (sentinel recency, zero aggregates) instead of failing.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

use crate::data::encoder::{CategoricalEncoder, EncoderSet};
use crate::domain::entities::{Customer, Product, Transaction};
use crate::domain::features::{
    CustomerFeatures, TrainingExample, CATEGORIES, RECENCY_SENTINEL_DAYS,
};

/// The temporal parameters of one feature-engineering run.
#[derive(Debug, Clone, Copy)]
pub struct FeatureParams {
    /// Feature cutoff — transactions after this date are invisible
    /// to the features and only feed the label.
    pub as_of: NaiveDate,
    /// Repurchase horizon in days. 30 by default at the CLI layer.
    pub horizon_days: i64,
}

impl FeatureParams {
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days < 1 {
            bail!("repurchase horizon must be >= 1 day, got {}", self.horizon_days);
        }
        Ok(())
    }

    fn label_window_end(&self) -> NaiveDate {
        self.as_of + Duration::days(self.horizon_days)
    }
}

/// Fit the categorical encoders on the stage layer. Called once by
/// the features stage; every later stage loads the persisted result.
pub fn fit_encoders(customers: &[Customer], transactions: &[Transaction]) -> EncoderSet {
    EncoderSet {
        gender: CategoricalEncoder::fit(
            "gender",
            customers.iter().map(|c| c.gender.as_str()),
        ),
        preferred_category: CategoricalEncoder::fit(
            "preferred_category",
            customers.iter().map(|c| c.preferred_category.as_str()),
        ),
        payment_method: CategoricalEncoder::fit(
            "payment_method",
            transactions.iter().map(|t| t.payment_method.as_str()),
        ),
    }
}

pub struct FeatureBuilder<'a> {
    encoders: &'a EncoderSet,
    params: FeatureParams,
    /// product_id → catalog category, for the spend-share columns.
    product_category: HashMap<u32, &'a str>,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(
        encoders: &'a EncoderSet,
        products: &'a [Product],
        params: FeatureParams,
    ) -> Result<Self> {
        params.validate()?;
        let product_category = products
            .iter()
            .map(|p| (p.product_id, p.category.as_str()))
            .collect();
        Ok(Self { encoders, params, product_category })
    }

    /// Build one TrainingExample per customer. Output order follows
    /// the input customer order (the stage layer is id-sorted, so the
    /// processed layer is too).
    pub fn build(
        &self,
        customers: &[Customer],
        transactions: &[Transaction],
    ) -> Result<Vec<TrainingExample>> {
        // Group completed transactions by customer once, instead of
        // scanning the whole table per customer.
        let mut by_customer: HashMap<u32, Vec<&Transaction>> = HashMap::new();
        for txn in transactions.iter().filter(|t| t.is_completed()) {
            by_customer.entry(txn.customer_id).or_default().push(txn);
        }

        customers
            .iter()
            .map(|customer| {
                let history = by_customer
                    .get(&customer.customer_id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                self.build_one(customer, history)
            })
            .collect()
    }

    fn build_one(
        &self,
        customer: &Customer,
        history: &[&Transaction],
    ) -> Result<TrainingExample> {
        let as_of = self.params.as_of;

        let before: Vec<&Transaction> =
            history.iter().copied().filter(|t| t.date <= as_of).collect();

        let label = history.iter().any(|t| {
            t.date > as_of && t.date <= self.params.label_window_end()
        }) as u8;

        // ── RFM core ──────────────────────────────────────────────────────────
        let (recency_days, frequency, monetary_total) = if before.is_empty() {
            (RECENCY_SENTINEL_DAYS, 0.0, 0.0)
        } else {
            let last = before.iter().map(|t| t.date).max().unwrap_or(as_of);
            let total: f64 = before.iter().map(|t| t.total_amount).sum();
            ((as_of - last).num_days() as f64, before.len() as f64, total)
        };
        let monetary_avg =
            if frequency > 0.0 { monetary_total / frequency } else { 0.0 };

        // ── Behavioural aggregates ────────────────────────────────────────────
        let avg_quantity = if before.is_empty() {
            0.0
        } else {
            before.iter().map(|t| t.quantity as f64).sum::<f64>() / before.len() as f64
        };
        let distinct_products = {
            let mut ids: Vec<u32> = before.iter().map(|t| t.product_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids.len() as f64
        };
        let tenure_days =
            (as_of - customer.registration_date).num_days().max(0) as f64;

        // ── Encoded categoricals ──────────────────────────────────────────────
        let age = customer
            .age
            .with_context(|| {
                format!(
                    "customer {} reached feature engineering with a missing age — \
                     stage layer is corrupt",
                    customer.customer_id
                )
            })? as f64;
        let gender_code = self.encoders.gender.transform(&customer.gender)? as f64;
        let preferred_category_code = self
            .encoders
            .preferred_category
            .transform(&customer.preferred_category)? as f64;
        let payment_method_code = match modal_payment_method(&before) {
            Some(method) => self.encoders.payment_method.transform(method)? as f64,
            // No history, no modal method — a fixed neutral code keeps
            // the column well-defined for never-buyers.
            None => 0.0,
        };

        // ── Category spend shares ─────────────────────────────────────────────
        let mut category_spend = [0.0f64; CATEGORIES.len()];
        for txn in &before {
            let category = self
                .product_category
                .get(&txn.product_id)
                .with_context(|| {
                    format!(
                        "transaction {} references unknown product {}",
                        txn.transaction_id, txn.product_id
                    )
                })?;
            let slot = CATEGORIES
                .iter()
                .position(|c| c == category)
                .with_context(|| format!("unexpected catalog category '{category}'"))?;
            category_spend[slot] += txn.total_amount;
        }
        let shares = normalise(&category_spend);

        // ── Quarterly purchase shares (seasonality) ───────────────────────────
        let mut quarter_counts = [0.0f64; 4];
        for txn in &before {
            quarter_counts[(txn.date.month0() / 3) as usize] += 1.0;
        }
        let quarters = normalise(&quarter_counts);

        let features = CustomerFeatures {
            customer_id: customer.customer_id,
            recency_days,
            frequency,
            monetary_total,
            monetary_avg,
            avg_quantity,
            distinct_products,
            tenure_days,
            age,
            gender_code,
            preferred_category_code,
            payment_method_code,
            share_beauty: shares[0],
            share_books: shares[1],
            share_clothing: shares[2],
            share_electronics: shares[3],
            share_home_garden: shares[4],
            share_sports: shares[5],
            q1_share: quarters[0],
            q2_share: quarters[1],
            q3_share: quarters[2],
            q4_share: quarters[3],
        };

        Ok(TrainingExample { features, label })
    }
}

/// Most frequent payment method in the pre-cutoff history; ties break
/// alphabetically so the encoding is deterministic across runs.
fn modal_payment_method<'t>(before: &[&'t Transaction]) -> Option<&'t str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for txn in before {
        *counts.entry(txn.payment_method.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(ma, ca), (mb, cb)| ca.cmp(cb).then(mb.cmp(ma)))
        .map(|(method, _)| method)
}

fn normalise<const N: usize>(values: &[f64; N]) -> [f64; N] {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        let mut out = [0.0; N];
        for (o, v) in out.iter_mut().zip(values) {
            *o = v / total;
        }
        out
    } else {
        [0.0; N]
    }
}
