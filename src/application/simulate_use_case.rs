// ============================================================
// Layer 2 — Simulate Use Case
// ============================================================
// Generates the synthetic raw layer and writes it to the lake.
// Same seed, same bytes on disk — the whole pipeline downstream
// of this stage is reproducible from (seed, config) alone.

use anyhow::Result;

use crate::data::simulator::{SimConfig, Simulator};
use crate::infra::lake::DataLake;

pub struct SimulateUseCase {
    cfg: SimConfig,
    lake: DataLake,
}

impl SimulateUseCase {
    pub fn new(lake_root: &str, cfg: SimConfig) -> Self {
        Self { cfg, lake: DataLake::new(lake_root) }
    }

    pub fn run(&self) -> Result<()> {
        tracing::info!(
            "Simulating {} customers, {} products, {} transactions (seed {})",
            self.cfg.customers,
            self.cfg.products,
            self.cfg.transactions,
            self.cfg.seed,
        );
        let data = Simulator::new(self.cfg.clone())?.run();
        self.lake.write_raw(&data)?;
        println!(
            "Raw layer written: {} customers, {} products, {} transactions",
            data.customers.len(),
            data.products.len(),
            data.transactions.len(),
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_writes_readable_raw_layer() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SimConfig {
            customers: 20,
            products: 10,
            transactions: 100,
            ..SimConfig::default()
        };
        let root = dir.path().display().to_string();
        SimulateUseCase::new(&root, cfg).run().unwrap();

        let raw = DataLake::new(&root).read_raw().unwrap();
        assert_eq!(raw.customers.len(), 20);
        assert_eq!(raw.products.len(), 10);
        // Noise injection may add duplicate rows on top of the base count
        assert!(raw.transactions.len() >= 100);
    }
}
