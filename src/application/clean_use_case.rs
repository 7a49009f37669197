// ============================================================
// Layer 2 — Clean Use Case
// ============================================================
// Raw layer in, stage layer + data-quality summary out. The
// cleaning rules themselves live in data::cleaner; this use case
// only moves tables through the lake and reports what happened.

use anyhow::Result;

use crate::data::cleaner::{Cleaner, QualityReport};
use crate::infra::lake::DataLake;

pub struct CleanUseCase {
    lake: DataLake,
}

impl CleanUseCase {
    pub fn new(lake_root: &str) -> Self {
        Self { lake: DataLake::new(lake_root) }
    }

    pub fn run(&self) -> Result<QualityReport> {
        let raw = self.lake.read_raw()?;
        let cleaner = Cleaner::new();

        let (customers, customer_quality) = cleaner.clean_customers(raw.customers);
        let (products, product_quality) = cleaner.clean_products(raw.products);
        let (transactions, transaction_quality) =
            cleaner.clean_transactions(raw.transactions);

        let report = QualityReport {
            customers: customer_quality,
            products: product_quality,
            transactions: transaction_quality,
        };
        self.lake
            .write_stage(&customers, &products, &transactions, &report)?;

        println!(
            "Stage layer written: {} customers, {} products, {} transactions",
            customers.len(),
            products.len(),
            transactions.len(),
        );
        println!(
            "Quality: {} duplicates dropped, {} nulls filled, {} invalid dropped, \
             {} outliers clipped, {} amounts repaired",
            report.customers.duplicates_dropped
                + report.products.duplicates_dropped
                + report.transactions.duplicates_dropped,
            report.customers.nulls_filled,
            report.transactions.invalid_dropped,
            report.transactions.outliers_clipped,
            report.transactions.amounts_repaired,
        );
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::simulate_use_case::SimulateUseCase;
    use crate::data::simulator::SimConfig;

    #[test]
    fn test_clean_runs_on_noisy_raw_layer() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        let cfg = SimConfig {
            customers: 30,
            products: 10,
            transactions: 200,
            noise: 0.1,
            ..SimConfig::default()
        };
        SimulateUseCase::new(&root, cfg).run().unwrap();

        let report = CleanUseCase::new(&root).run().unwrap();
        assert!(report.transactions.rows_out <= report.transactions.rows_in);

        // The stage layer must round-trip and contain only valid amounts
        let (_, _, transactions) = DataLake::new(&root).read_stage().unwrap();
        assert_eq!(transactions.len(), report.transactions.rows_out);
        assert!(transactions.iter().all(|t| t.total_amount > 0.0));
    }
}
