// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one and
// the thin Dataset/Batcher adapters in the data layer.
//
// Why isolate Burn code here?
//   - If Burn's API changes, we only update this layer
//   - Other layers are testable without a tensor backend
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   model.rs      — The dense retention network
//                   input → 256 → 128 → 64 → 32 → 1 with
//                   batch-norm, dropout and a sigmoid head,
//                   plus the class-weighted BCE loss
//
//   trainer.rs    — The training loop
//                   Adam + weight decay (L2), per-epoch
//                   learning-rate decay, early stopping,
//                   NaN-loss abort, history logging
//
//   evaluation.rs — Threshold metrics, rank-based AUC and the
//                   first-layer feature-importance ranking
//
//   predictor.rs  — The inference engine: loads the persisted
//                   model + scaler and scores feature vectors

/// Dense network architecture and class-weighted loss
pub mod model;

/// Full training loop with validation, early stopping, checkpointing
pub mod trainer;

/// AUC, accuracy/precision/recall, feature importance
pub mod evaluation;

/// Inference engine — loads artifacts and predicts probabilities
pub mod predictor;
