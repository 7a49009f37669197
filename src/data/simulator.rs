// ============================================================
// Layer 4 — Data Simulator
// ============================================================
// Generates the synthetic raw layer: customers, products and
// transactions with plausible statistical shape.
//
// RULE: nothing here may call a platform RNG. All randomness flows
// through one StdRng seeded from the config, so a fixed seed gives
// a bit-identical raw layer on every run and on every machine.
//
// Distribution choices:
//   - ages            ~ normal(38, 13), clipped to [18, 95]
//   - catalog prices  ~ log-normal (median ≈ €30, long right tail)
//   - purchase dates  ~ exponential days-back from the window end,
//                       so activity skews toward recency
//   - quantities      ~ geometric-ish, mostly 1-2 items
//   - buyer choice    ~ squared-uniform index, so a minority of
//                       customers generates a majority of purchases
//
// The normal and log-normal samplers are hand-rolled over the
// uniform source (Box-Muller) to keep the dependency surface at
// `rand` alone.
//
// A small seeded noise pass then punches holes into the output
// (missing ages/locations, duplicated transaction ids, broken or
// non-positive totals) so the cleaning stage has real work to do.
// Noise rows are the ONLY rows allowed to violate the amount
// invariant quantity * unit_price == total_amount.

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Customer, Product, Transaction, STATUS_CANCELLED, STATUS_COMPLETED, STATUS_REFUNDED,
};
use crate::domain::features::CATEGORIES;

/// Payment methods the simulator draws from, with rough real-world
/// weights. The feature builder encodes a customer's modal method.
pub const PAYMENT_METHODS: [&str; 5] = [
    "bank_transfer",
    "cash_on_delivery",
    "credit_card",
    "debit_card",
    "paypal",
];
const PAYMENT_WEIGHTS: [f64; 5] = [0.08, 0.07, 0.40, 0.25, 0.20];

const GENDERS: [&str; 3] = ["female", "male", "other"];
const GENDER_WEIGHTS: [f64; 3] = [0.49, 0.48, 0.03];

const LOCATIONS: [&str; 10] = [
    "Amsterdam", "Berlin", "Dublin", "Lisbon", "London",
    "Madrid", "Paris", "Prague", "Vienna", "Warsaw",
];

const BRANDS: [&str; 12] = [
    "Acme", "Aurora", "Borealis", "Cobalt", "Drift", "Ember",
    "Fable", "Meridian", "Nimbus", "Orchard", "Quill", "Vertex",
];

// ─── Configuration ────────────────────────────────────────────────────────────

/// All knobs for one simulation run. Serialisable so a run's exact
/// generation parameters can be kept next to its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub customers: usize,
    pub products: usize,
    pub transactions: usize,
    /// First possible registration / purchase date.
    pub start_date: NaiveDate,
    /// Last possible purchase date (exclusive upper bound is the day after).
    pub end_date: NaiveDate,
    /// Master seed — same seed, same raw layer, byte for byte.
    pub seed: u64,
    /// Fraction of rows the noise pass may corrupt, in [0.0, 0.5].
    pub noise: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            customers: 1_000,
            products: 200,
            transactions: 10_000,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            seed: 42,
            noise: 0.02,
        }
    }
}

impl SimConfig {
    /// Reject impossible configurations before any generation starts.
    /// This is the "configuration error" class of the error taxonomy:
    /// fail fast, generate nothing.
    pub fn validate(&self) -> Result<()> {
        if self.customers == 0 || self.products == 0 || self.transactions == 0 {
            bail!(
                "simulation counts must all be >= 1 \
                 (customers={}, products={}, transactions={})",
                self.customers,
                self.products,
                self.transactions
            );
        }
        if self.start_date >= self.end_date {
            bail!(
                "start_date {} must be before end_date {}",
                self.start_date,
                self.end_date
            );
        }
        if !(0.0..=0.5).contains(&self.noise) {
            bail!("noise fraction {} must be within [0.0, 0.5]", self.noise);
        }
        Ok(())
    }
}

/// The three raw tables of one simulated run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedData {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub transactions: Vec<Transaction>,
}

// ─── Simulator ────────────────────────────────────────────────────────────────

pub struct Simulator {
    cfg: SimConfig,
    rng: StdRng,
}

impl Simulator {
    /// Validate the config and set up the seeded RNG.
    pub fn new(cfg: SimConfig) -> Result<Self> {
        cfg.validate()?;
        let rng = StdRng::seed_from_u64(cfg.seed);
        Ok(Self { cfg, rng })
    }

    /// Generate the full raw layer. Consumes the simulator — the RNG
    /// stream is only valid for one pass.
    pub fn run(mut self) -> SimulatedData {
        let customers = self.generate_customers();
        let products = self.generate_products();
        let mut transactions = self.generate_transactions(&customers, &products);
        let mut customers = customers;
        self.inject_noise(&mut customers, &mut transactions);

        tracing::info!(
            "Simulated {} customers, {} products, {} transactions (seed {})",
            customers.len(),
            products.len(),
            transactions.len(),
            self.cfg.seed,
        );

        SimulatedData { customers, products, transactions }
    }

    fn generate_customers(&mut self) -> Vec<Customer> {
        let window_days = (self.cfg.end_date - self.cfg.start_date).num_days();
        (0..self.cfg.customers)
            .map(|i| {
                let age = self.sample_normal(38.0, 13.0).round().clamp(18.0, 95.0) as u32;
                let registration_date = self.cfg.start_date
                    + Duration::days(self.rng.gen_range(0..window_days));
                Customer {
                    customer_id: i as u32 + 1,
                    age: Some(age),
                    gender: self.weighted_pick(&GENDERS, &GENDER_WEIGHTS).to_string(),
                    location: Some(
                        LOCATIONS[self.rng.gen_range(0..LOCATIONS.len())].to_string(),
                    ),
                    registration_date,
                    preferred_category: CATEGORIES
                        [self.rng.gen_range(0..CATEGORIES.len())]
                    .to_string(),
                }
            })
            .collect()
    }

    fn generate_products(&mut self) -> Vec<Product> {
        (0..self.cfg.products)
            .map(|i| {
                // Log-normal price: exp(N(3.4, 0.7)) → median ~30, long tail
                let price = round2(self.sample_log_normal(3.4, 0.7).clamp(1.0, 2_000.0));
                // Margin between 25% and 60% of the sale price
                let margin = self.rng.gen_range(0.25..0.60);
                let cost = round2(price * (1.0 - margin));
                let rating = round1(self.sample_normal(4.0, 0.6).clamp(1.0, 5.0));
                Product {
                    product_id: i as u32 + 1,
                    category: CATEGORIES[self.rng.gen_range(0..CATEGORIES.len())]
                        .to_string(),
                    brand: BRANDS[self.rng.gen_range(0..BRANDS.len())].to_string(),
                    price,
                    cost,
                    rating,
                }
            })
            .collect()
    }

    fn generate_transactions(
        &mut self,
        customers: &[Customer],
        products: &[Product],
    ) -> Vec<Transaction> {
        let window_days = (self.cfg.end_date - self.cfg.start_date).num_days();

        (0..self.cfg.transactions)
            .map(|i| {
                // Squared uniform skews buyer choice toward low indices:
                // a minority of customers carries most of the volume.
                let u: f64 = self.rng.gen();
                let index = (((u * u) * customers.len() as f64) as usize)
                    .min(customers.len() - 1);
                let customer = &customers[index];

                let product = self.pick_product(customer, products);

                // Exponential days-back from the window end skews purchase
                // activity toward recency; clamp into the customer's own
                // active window so nobody buys before registering.
                let mean_back = (window_days as f64 / 4.0).max(1.0);
                let days_back =
                    (self.sample_exponential(mean_back) as i64).clamp(0, window_days);
                let mut date = self.cfg.end_date - Duration::days(days_back);
                if date < customer.registration_date {
                    date = customer.registration_date;
                }

                // Mostly single-item baskets with a geometric tail
                let mut quantity = 1u32;
                while quantity < 8 && self.rng.gen_bool(0.35) {
                    quantity += 1;
                }

                // Occasional discount off the catalog price
                let discount = if self.rng.gen_bool(0.15) {
                    if self.rng.gen_bool(0.5) { 0.9 } else { 0.8 }
                } else {
                    1.0
                };
                let unit_price = round2(product.price * discount);
                let total_amount = round2(quantity as f64 * unit_price);

                let status_roll: f64 = self.rng.gen();
                let status = if status_roll < 0.92 {
                    STATUS_COMPLETED
                } else if status_roll < 0.97 {
                    STATUS_REFUNDED
                } else {
                    STATUS_CANCELLED
                };

                Transaction {
                    transaction_id: i as u32 + 1,
                    customer_id: customer.customer_id,
                    product_id: product.product_id,
                    date,
                    quantity,
                    unit_price,
                    total_amount,
                    payment_method: self
                        .weighted_pick(&PAYMENT_METHODS, &PAYMENT_WEIGHTS)
                        .to_string(),
                    status: status.to_string(),
                }
            })
            .collect()
    }

    /// 70% of purchases come from the customer's preferred category.
    fn pick_product<'a>(
        &mut self,
        customer: &Customer,
        products: &'a [Product],
    ) -> &'a Product {
        if self.rng.gen_bool(0.7) {
            let preferred: Vec<&Product> = products
                .iter()
                .filter(|p| p.category == customer.preferred_category)
                .collect();
            if !preferred.is_empty() {
                return preferred[self.rng.gen_range(0..preferred.len())];
            }
        }
        &products[self.rng.gen_range(0..products.len())]
    }

    /// Corrupt a seeded fraction of rows so the cleaning stage has
    /// something to validate, repair and report on.
    fn inject_noise(
        &mut self,
        customers: &mut Vec<Customer>,
        transactions: &mut Vec<Transaction>,
    ) {
        let p = self.cfg.noise;
        if p == 0.0 {
            return;
        }

        for customer in customers.iter_mut() {
            if self.rng.gen_bool(p) {
                customer.age = None;
            }
            if self.rng.gen_bool(p) {
                customer.location = None;
            }
        }

        let mut duplicates = Vec::new();
        for txn in transactions.iter_mut() {
            if self.rng.gen_bool(p / 2.0) {
                // Exact duplicate, same transaction_id — cleaner keeps first
                duplicates.push(txn.clone());
            }
            if self.rng.gen_bool(p / 2.0) {
                // Invalid monetary amount — cleaner must drop the row
                txn.total_amount = -txn.total_amount;
            } else if self.rng.gen_bool(p / 2.0) {
                // Amount drifts away from quantity * unit_price —
                // cleaner repairs it back to the product
                txn.total_amount = round2(txn.total_amount + 7.77);
            }
        }
        transactions.extend(duplicates);
    }

    // ─── Distribution helpers over the uniform source ─────────────────────────

    /// Standard Box-Muller transform.
    fn sample_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(1e-12);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// exp(N(mu, sigma)) — the classic long-tailed amount distribution.
    fn sample_log_normal(&mut self, mu: f64, sigma: f64) -> f64 {
        self.sample_normal(mu, sigma).exp()
    }

    /// Inverse-CDF exponential with the given mean.
    fn sample_exponential(&mut self, mean: f64) -> f64 {
        let u: f64 = self.rng.gen::<f64>().max(1e-12);
        -u.ln() * mean
    }

    /// Weighted choice from parallel item/weight slices.
    fn weighted_pick<'a>(&mut self, items: &[&'a str], weights: &[f64]) -> &'a str {
        let total: f64 = weights.iter().sum();
        let mut roll = self.rng.gen::<f64>() * total;
        for (item, w) in items.iter().zip(weights) {
            if roll < *w {
                return item;
            }
            roll -= w;
        }
        items[items.len() - 1]
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
