// ============================================================
// Layer 2 — Application (Use Cases)
// ============================================================
// One use case per pipeline stage. Each use case orchestrates the
// domain, data, ml and infra layers for a single user-facing
// operation and owns nothing but the orchestration — all actual
// logic lives in the layers below.
//
//   SimulateUseCase → raw layer on disk
//   CleanUseCase    → stage layer + quality summary
//   FeaturesUseCase → processed layer + fitted encoders
//   TrainUseCase    → model artifacts + metrics
//   QueryUseCase    → probabilities from the trained artifacts
//   PipelineUseCase → the first four, in order

pub mod simulate_use_case;

pub mod clean_use_case;

pub mod features_use_case;

pub mod train_use_case;

pub mod query_use_case;

pub mod pipeline_use_case;
