// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Traits define the seams between layers. By programming against
// traits instead of concrete types, we can swap implementations
// without changing the code that uses them.
//
// This is the Dependency Inversion Principle from SOLID,
// applied using Rust's trait system.

use anyhow::Result;
use std::path::Path;

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any fitted preprocessing component whose parameters can be saved
/// and restored from disk as a versioned artifact.
///
/// The point: encoders and scalers must be IMMUTABLE configuration
/// snapshots shared between training and inference, never refit at
/// query time. Implementations:
///   - StandardScaler       → scaler.json
///   - CategoricalEncoder   → encoders.json (one per column)
pub trait Persistable: Sized {
    /// Save this component's fitted state to the given path.
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a previously fitted component from the given path.
    fn load(path: &Path) -> Result<Self>;
}

// ─── RetentionScorer ──────────────────────────────────────────────────────────
/// Any component that can score customers for repurchase likelihood.
///
/// Implementations:
///   - QueryUseCase → wraps the trained dense network
pub trait RetentionScorer {
    /// Repurchase probability in [0, 1] for one known customer.
    /// An unknown customer id is an explicit error, never a default.
    fn probability(&self, customer_id: u32) -> Result<f64>;

    /// The top `n` customers by probability, descending, ties broken
    /// by ascending customer id. Returns fewer than `n` entries only
    /// when the scored pool is smaller.
    fn top_n(&self, n: usize) -> Result<Vec<(u32, f64)>>;
}
