use anyhow::Result;
use burn::{
    nn::{
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct RetentionNetConfig {
    pub input_dim: usize,
    pub hidden_sizes: Vec<usize>,
    pub dropout: f64,
}

impl RetentionNetConfig {
    /// The published architecture: input → 256 → 128 → 64 → 32 → 1.
    pub fn standard(input_dim: usize, dropout: f64) -> Self {
        Self::new(input_dim, vec![256, 128, 64, 32], dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RetentionNet<B> {
        let mut blocks = Vec::with_capacity(self.hidden_sizes.len());
        let mut width = self.input_dim;
        for &hidden in &self.hidden_sizes {
            blocks.push(self.build_block(width, hidden, device));
            width = hidden;
        }
        let output = LinearConfig::new(width, 1).init(device);
        RetentionNet { blocks, output }
    }

    fn build_block<B: Backend>(
        &self,
        input: usize,
        output: usize,
        device: &B::Device,
    ) -> DenseBlock<B> {
        DenseBlock {
            linear: LinearConfig::new(input, output).init(device),
            norm: BatchNormConfig::new(output).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// One hidden layer: Linear → BatchNorm → ReLU → Dropout.
/// Batch-norm stabilises the widely varying feature scales left
/// after standardisation (shares in [0,1] next to sentinel recency),
/// dropout fights overfitting on the small tabular snapshot.
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub linear: Linear<B>,
    pub norm: BatchNorm<B, 0>,
    pub dropout: Dropout,
}

impl<B: Backend> DenseBlock<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = self.norm.forward(x);
        let x = activation::relu(x);
        self.dropout.forward(x)
    }
}

/// The dense repurchase-probability network. `forward` returns raw
/// logits; callers apply sigmoid when a probability is needed.
#[derive(Module, Debug)]
pub struct RetentionNet<B: Backend> {
    pub blocks: Vec<DenseBlock<B>>,
    pub output: Linear<B>,
}

impl<B: Backend> RetentionNet<B> {
    /// features: [batch, input_dim] → logits: [batch]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch_size, _] = features.dims();
        let mut x = features;
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.output.forward(x).reshape([batch_size])
    }

    /// forward + sigmoid: probabilities in [0, 1].
    pub fn forward_proba(&self, features: Tensor<B, 2>) -> Tensor<B, 1> {
        activation::sigmoid(self.forward(features))
    }

    /// Class-weighted binary cross-entropy:
    ///
    ///   loss = −mean( w₁·y·ln(p) + w₀·(1−y)·ln(1−p) )
    ///
    /// with w₀/w₁ taken from the training-partition label balance.
    /// Probabilities are clamped away from {0, 1} so a saturated
    /// sigmoid cannot produce ln(0) = −∞ and poison the gradients.
    pub fn forward_loss(
        &self,
        features: Tensor<B, 2>,
        targets: Tensor<B, 1>,
        weight_negative: f64,
        weight_positive: f64,
    ) -> Tensor<B, 1> {
        let proba = self
            .forward_proba(features)
            .clamp(1e-7, 1.0 - 1e-7);

        let positive_term = targets
            .clone()
            .mul(proba.clone().log())
            .mul_scalar(weight_positive);
        let negative_term = targets
            .neg()
            .add_scalar(1.0)
            .mul(proba.neg().add_scalar(1.0).log())
            .mul_scalar(weight_negative);

        (positive_term + negative_term).mean().neg()
    }

    /// Mean absolute first-layer weight per input feature — the
    /// persisted feature-importance signal. Shape: [input_dim].
    pub fn input_weight_magnitudes(&self) -> Result<Vec<f32>> {
        let first = match self.blocks.first() {
            Some(block) => block,
            None => return Ok(Vec::new()),
        };
        let weight = first.linear.weight.val(); // [input_dim, hidden]
        let [input_dim, _] = weight.dims();
        weight
            .abs()
            .mean_dim(1)
            .reshape([input_dim])
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("cannot read first-layer weights: {e:?}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model: RetentionNet<TestBackend> =
            RetentionNetConfig::standard(21, 0.0).init(&device);

        let input = Tensor::<TestBackend, 2>::zeros([4, 21], &device);
        let logits = model.forward(input);
        assert_eq!(logits.dims(), [4]);
    }

    #[test]
    fn test_probabilities_bounded() {
        let device = Default::default();
        let model: RetentionNet<TestBackend> =
            RetentionNetConfig::new(5, vec![8, 4], 0.0).init(&device);

        let input = Tensor::<TestBackend, 2>::from_floats(
            [[100.0, -100.0, 3.0, 0.0, 1.0], [0.0, 0.0, 0.0, 0.0, 0.0]],
            &device,
        );
        let proba: Vec<f32> = model
            .forward_proba(input)
            .into_data()
            .to_vec()
            .unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_loss_is_finite_on_extreme_inputs() {
        let device = Default::default();
        let model: RetentionNet<TestBackend> =
            RetentionNetConfig::new(3, vec![8], 0.0).init(&device);

        let features = Tensor::<TestBackend, 2>::from_floats(
            [[1e6, -1e6, 0.0], [0.0, 0.0, 0.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);
        let loss: f64 = model
            .forward_loss(features, targets, 1.0, 3.0)
            .into_scalar()
            .elem::<f64>();
        assert!(loss.is_finite());
    }

    #[test]
    fn test_importance_covers_every_input_feature() {
        let device = Default::default();
        let model: RetentionNet<TestBackend> =
            RetentionNetConfig::standard(21, 0.1).init(&device);
        let magnitudes = model.input_weight_magnitudes().unwrap();
        assert_eq!(magnitudes.len(), 21);
        assert!(magnitudes.iter().all(|m| *m >= 0.0));
    }

    #[test]
    fn test_importance_of_empty_network_is_empty() {
        let device = Default::default();
        let model: RetentionNet<TestBackend> =
            RetentionNetConfig::new(4, Vec::new(), 0.0).init(&device);
        assert!(model.input_weight_magnitudes().unwrap().is_empty());
    }
}
