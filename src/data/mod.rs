// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "nothing on disk" and "tensor batches in
// the training loop" lives here.
//
// The pipeline flows in this order:
//
//   Simulator        → writes the raw layer (customers, products,
//       │              transactions) from seeded distributions
//       ▼
//   Cleaner          → validates and repairs the raw tables,
//       │              writes the stage layer + quality summary
//       ▼
//   FeatureBuilder   → aggregates transactions into one RFM
//       │              feature row per customer + binary label
//       ▼
//   CategoricalEncoder → string columns become stable integer codes
//       │
//       ▼
//   StandardScaler   → zero mean / unit variance, fit on train only
//       │
//       ▼
//   splitter         → stratified train / validation / test
//       │
//       ▼
//   RetentionDataset → implements Burn's Dataset trait
//       │
//       ▼
//   RetentionBatcher → stacks rows into 2-D feature tensors
//       │
//       ▼
//   DataLoader       → feeds batches to the training loop
//
// Each module is responsible for exactly one step. This makes
// each step independently testable and replaceable.

/// Generates the synthetic raw layer from seeded distributions
pub mod simulator;

/// Validates and repairs raw tables, emits the quality summary
pub mod cleaner;

/// RFM + behavioural feature engineering and label assembly
pub mod features;

/// Fitted string → integer-code mapping, persisted as JSON
pub mod encoder;

/// Fitted standardisation (mean / std), persisted as JSON
pub mod scaler;

/// Stratified, seeded train / validation / test splitting
pub mod splitter;

/// Implements Burn's Dataset trait for training examples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
