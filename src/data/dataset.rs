use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One scaled feature vector with its binary label, ready for
/// batching. Scaling happened upstream (train-partition statistics
/// only), so this struct is framework-ready but framework-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSample {
    pub features: Vec<f32>,
    pub label: f32,
}

/// Implements Burn's Dataset trait so the DataLoader can pull
/// samples by index.
pub struct RetentionDataset {
    samples: Vec<RetentionSample>,
}

impl RetentionDataset {
    pub fn new(samples: Vec<RetentionSample>) -> Self {
        Self { samples }
    }

    pub fn positives(&self) -> usize {
        self.samples.iter().filter(|s| s.label > 0.5).count()
    }
}

impl Dataset<RetentionSample> for RetentionDataset {
    fn get(&self, index: usize) -> Option<RetentionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_indexing() {
        let dataset = RetentionDataset::new(vec![
            RetentionSample { features: vec![0.0, 1.0], label: 1.0 },
            RetentionSample { features: vec![2.0, 3.0], label: 0.0 },
        ]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(1).unwrap().features, vec![2.0, 3.0]);
        assert!(dataset.get(2).is_none());
        assert_eq!(dataset.positives(), 1);
    }
}
