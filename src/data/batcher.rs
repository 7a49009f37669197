// ============================================================
// Layer 4 — Retention Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<RetentionSample>
// into tensors for the model forward pass.
//
// Input:  Vec of N samples, each with a feature vector of width D
// Output: RetentionBatch with features [N, D] and targets [N]
//
// All feature vectors already have the same width (FEATURE_DIM via
// the scaler), so batching is a flatten + reshape with no padding.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::RetentionSample;
use crate::domain::features::FEATURE_DIM;

/// A batch of scaled feature rows ready for the model.
/// B is the Burn Backend — generic so the same batcher serves the
/// autodiff training backend and the plain validation backend.
#[derive(Debug, Clone)]
pub struct RetentionBatch<B: Backend> {
    /// Scaled features — shape: [batch_size, feature_dim]
    pub features: Tensor<B, 2>,
    /// Binary labels as floats — shape: [batch_size]
    pub targets: Tensor<B, 1>,
}

#[derive(Clone, Debug)]
pub struct RetentionBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> RetentionBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<RetentionSample, RetentionBatch<B>> for RetentionBatcher<B> {
    fn batch(&self, items: Vec<RetentionSample>) -> RetentionBatch<B> {
        let batch_size = items.len();
        // An empty batch still gets a well-formed [0, D] tensor
        let feature_dim = items.first().map_or(FEATURE_DIM, |s| s.features.len());

        let features_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();
        let targets_flat: Vec<f32> = items.iter().map(|s| s.label).collect();

        let features = Tensor::<B, 1>::from_floats(features_flat.as_slice(), &self.device)
            .reshape([batch_size, feature_dim]);
        let targets = Tensor::<B, 1>::from_floats(targets_flat.as_slice(), &self.device);

        RetentionBatch { features, targets }
    }
}
