// ============================================================
// Layer 4 — Cleaning Stage
// ============================================================
// Validates and repairs the raw tables, producing the stage layer
// plus a structured data-quality summary.
//
// Policy (documented here, enforced below):
//   - duplicate ids            → keep the FIRST occurrence
//   - missing age              → impute with the median of present ages
//   - missing location         → fill with the "Unknown" sentinel
//   - age outside [18, 95]     → clip into range
//   - rating outside [1, 5]    → clip into range
//   - quantity/price/amount <= 0 → row dropped (invalid monetary data)
//   - total != quantity * unit_price (±1 cent) → repaired to the product
//   - total above AMOUNT_CAP   → clipped (unit price rescaled to keep
//                                the amount invariant intact)
//
// The cap is an ABSOLUTE threshold, not a percentile of the input:
// a percentile would move every time the stage ran on its own output
// and the stage must be idempotent — cleaning already-clean tables
// changes nothing and reports all-zero counters.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::entities::{Customer, Product, Transaction};

/// Sentinel for a missing categorical value.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Fixed upper bound for a single transaction amount. Anything above
/// is treated as an entry error and clipped.
pub const AMOUNT_CAP: f64 = 10_000.0;

const AGE_MIN: u32 = 18;
const AGE_MAX: u32 = 95;

// ─── Quality summary ──────────────────────────────────────────────────────────

/// Per-table cleaning counters. Serialised into
/// data/stage/data_quality_summary.json.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableQuality {
    pub rows_in: usize,
    pub rows_out: usize,
    pub nulls_filled: usize,
    pub duplicates_dropped: usize,
    pub invalid_dropped: usize,
    pub outliers_clipped: usize,
    pub amounts_repaired: usize,
}

impl TableQuality {
    /// True if this pass changed nothing — the idempotence signal.
    pub fn is_clean(&self) -> bool {
        self.rows_in == self.rows_out
            && self.nulls_filled == 0
            && self.duplicates_dropped == 0
            && self.invalid_dropped == 0
            && self.outliers_clipped == 0
            && self.amounts_repaired == 0
    }
}

/// The full data-quality report for one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub customers: TableQuality,
    pub products: TableQuality,
    pub transactions: TableQuality,
}

// ─── Cleaner ──────────────────────────────────────────────────────────────────

pub struct Cleaner;

impl Cleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean one customer table. Median-age imputation is computed from
    /// the rows that do carry an age; if none do, a neutral mid-range
    /// default is used so the stage still terminates.
    pub fn clean_customers(&self, raw: Vec<Customer>) -> (Vec<Customer>, TableQuality) {
        let mut quality = TableQuality { rows_in: raw.len(), ..Default::default() };

        let median_age = median_of_present_ages(&raw).unwrap_or(40);

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for mut customer in raw {
            if !seen.insert(customer.customer_id) {
                quality.duplicates_dropped += 1;
                continue;
            }
            match customer.age {
                None => {
                    customer.age = Some(median_age);
                    quality.nulls_filled += 1;
                }
                Some(age) if !(AGE_MIN..=AGE_MAX).contains(&age) => {
                    customer.age = Some(age.clamp(AGE_MIN, AGE_MAX));
                    quality.outliers_clipped += 1;
                }
                Some(_) => {}
            }
            if customer.location.is_none() {
                customer.location = Some(UNKNOWN_LOCATION.to_string());
                quality.nulls_filled += 1;
            }
            out.push(customer);
        }

        quality.rows_out = out.len();
        (out, quality)
    }

    /// Clean one product table: de-duplicate, drop non-positive prices,
    /// clip ratings into the valid star range.
    pub fn clean_products(&self, raw: Vec<Product>) -> (Vec<Product>, TableQuality) {
        let mut quality = TableQuality { rows_in: raw.len(), ..Default::default() };

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for mut product in raw {
            if !seen.insert(product.product_id) {
                quality.duplicates_dropped += 1;
                continue;
            }
            if product.price <= 0.0 || product.cost <= 0.0 {
                quality.invalid_dropped += 1;
                continue;
            }
            if !(1.0..=5.0).contains(&product.rating) {
                product.rating = product.rating.clamp(1.0, 5.0);
                quality.outliers_clipped += 1;
            }
            out.push(product);
        }

        quality.rows_out = out.len();
        (out, quality)
    }

    /// Clean one transaction table. Order of checks matters: a row is
    /// first judged valid (positive quantity/price/amount), then its
    /// amount is capped, then the amount invariant is repaired — so a
    /// clipped row still satisfies quantity * unit_price == total.
    pub fn clean_transactions(
        &self,
        raw: Vec<Transaction>,
    ) -> (Vec<Transaction>, TableQuality) {
        let mut quality = TableQuality { rows_in: raw.len(), ..Default::default() };

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for mut txn in raw {
            if !seen.insert(txn.transaction_id) {
                quality.duplicates_dropped += 1;
                continue;
            }
            if txn.quantity == 0 || txn.unit_price <= 0.0 || txn.total_amount <= 0.0 {
                quality.invalid_dropped += 1;
                continue;
            }
            if txn.total_amount > AMOUNT_CAP {
                // Floor (not round) the rescaled unit price so the
                // repaired product can never land back above the cap —
                // otherwise a second pass would clip the row again and
                // the stage would stop being idempotent.
                let unit_price =
                    (AMOUNT_CAP / txn.quantity as f64 * 100.0).floor() / 100.0;
                txn.unit_price = unit_price;
                txn.total_amount = round2(txn.quantity as f64 * unit_price);
                quality.outliers_clipped += 1;
            }
            if !txn.amount_consistent() {
                txn.total_amount = round2(txn.quantity as f64 * txn.unit_price);
                quality.amounts_repaired += 1;
            }
            out.push(txn);
        }

        quality.rows_out = out.len();
        (out, quality)
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn median_of_present_ages(customers: &[Customer]) -> Option<u32> {
    let mut ages: Vec<u32> = customers.iter().filter_map(|c| c.age).collect();
    if ages.is_empty() {
        return None;
    }
    ages.sort_unstable();
    Some(ages[ages.len() / 2])
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
