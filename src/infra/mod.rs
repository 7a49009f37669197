// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Everything that touches the filesystem lives here: the three
// data-lake layers, the model artifact store and the per-epoch
// training history log. The other layers hand this one plain
// structs and get plain structs back — no layer above ever builds
// a path itself.

/// The raw / stage / processed data-lake layers (CSV + JSON)
pub mod lake;

/// The model artifact store: weights, config, metadata, importance
pub mod checkpoint;

/// Per-epoch training metrics appended to training_history.csv
pub mod metrics;
