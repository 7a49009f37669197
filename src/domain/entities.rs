// ============================================================
// Layer 3 — Data-Lake Entities
// ============================================================
// The three raw tables of the data lake, as plain serde structs.
// csv + serde derive handles reading and writing the rows, which
// also doubles as the schema check: a stage refuses to start if a
// row fails to deserialize into these shapes.
//
// Optional fields model raw-layer missingness — the simulator can
// emit rows with a missing age or location, and the cleaning stage
// is the one (and only) place that fills them. From the stage layer
// onwards every field is present.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A customer record. Created once by the simulator, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: u32,

    /// Age in years — None in the raw layer means "missing", which the
    /// cleaning stage imputes with the median of present ages.
    pub age: Option<u32>,

    pub gender: String,

    /// Free-text location — None is filled with the "Unknown" sentinel.
    pub location: Option<String>,

    pub registration_date: NaiveDate,

    /// The category this customer gravitates towards. Drives the
    /// simulator's product choice and becomes a categorical feature.
    pub preferred_category: String,
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: u32,
    pub category: String,
    pub brand: String,
    pub price: f64,
    pub cost: f64,
    /// Average review rating, valid range [1.0, 5.0].
    pub rating: f64,
}

/// An append-only purchase event.
///
/// Invariant (enforced by the simulator, repaired by the cleaner):
///   quantity * unit_price == total_amount, within 2-dp rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: u32,
    pub customer_id: u32,
    pub product_id: u32,
    pub date: NaiveDate,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub status: String,
}

/// Transaction status values the simulator emits. Only completed
/// purchases count towards features and labels.
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_REFUNDED: &str = "refunded";
pub const STATUS_CANCELLED: &str = "cancelled";

impl Transaction {
    /// True if the recorded total matches quantity * unit_price
    /// within one cent.
    pub fn amount_consistent(&self) -> bool {
        let expected = self.quantity as f64 * self.unit_price;
        (self.total_amount - expected).abs() <= 0.01
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}
