// Convolutional feature extractor for stacked-frame image observations
use crate::trajectory::ObsShape;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

/// Output channels of the five conv stages before the width multiplier.
pub const BASE_CHANNELS: [usize; 5] = [32, 64, 64, 64, 64];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureExtractorConfig {
    /// Length of the embedding produced for each observation.
    #[serde(default = "default_features_dim")]
    pub features_dim: usize,
    /// Multiplier applied to every stage's base channel count.
    #[serde(default = "default_width")]
    pub width: usize,
}

fn default_features_dim() -> usize { 128 }
fn default_width() -> usize { 2 }

impl Default for FeatureExtractorConfig {
    fn default() -> Self {
        Self {
            features_dim: default_features_dim(),
            width: default_width(),
        }
    }
}

impl FeatureExtractorConfig {
    pub fn new(features_dim: usize, width: usize) -> Self {
        Self { features_dim, width }
    }

    pub fn stage_channels(&self) -> [usize; 5] {
        BASE_CHANNELS.map(|c| c * self.width)
    }

    pub fn init<B: Backend>(&self, obs_shape: ObsShape, device: &B::Device) -> MagicalCnn<B> {
        MagicalCnn::new(self, obs_shape, device)
    }
}

/// conv -> ReLU -> batch norm
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvStage<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        bias: bool,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_bias(bias)
            .init(device);
        let norm = BatchNormConfig::new(out_channels).init(device);
        Self { conv, norm }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv.forward(input));
        self.norm.forward(x)
    }
}

/// Five downsampling conv stages followed by a fully connected projection.
/// The first stage (5x5, stride 1) keeps its bias and preserves resolution;
/// the remaining 3x3 stride-2 stages halve it and leave the shift to batch
/// norm.
#[derive(Module, Debug)]
pub struct MagicalCnn<B: Backend> {
    stages: Vec<ConvStage<B>>,
    fc: Linear<B>,
    features_dim: usize,
    flat_features: usize,
}

impl<B: Backend> MagicalCnn<B> {
    pub fn new(config: &FeatureExtractorConfig, obs_shape: ObsShape, device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(BASE_CHANNELS.len());
        let mut in_channels = obs_shape.channels;
        for (i, out_channels) in config.stage_channels().into_iter().enumerate() {
            let stage = if i == 0 {
                ConvStage::new(in_channels, out_channels, 5, 1, 2, true, device)
            } else {
                ConvStage::new(in_channels, out_channels, 3, 2, 1, false, device)
            };
            stages.push(stage);
            in_channels = out_channels;
        }

        let flat_features = probe_flat_features(&stages, obs_shape, device);
        log::debug!(
            "Feature extractor for {} observations: {} flattened features -> {}",
            obs_shape,
            flat_features,
            config.features_dim
        );
        let fc = LinearConfig::new(flat_features, config.features_dim).init(device);

        Self {
            stages,
            fc,
            features_dim: config.features_dim,
            flat_features,
        }
    }

    /// `[batch, channels, height, width]` -> `[batch, features_dim]`
    pub fn forward(&self, obs: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = obs;
        for stage in self.stages.iter() {
            x = stage.forward(x);
        }
        let x = x.flatten::<2>(1, 3);
        relu(self.fc.forward(x))
    }

    pub fn features_dim(&self) -> usize {
        self.features_dim
    }

    /// Size of the flattened conv output feeding the projection layer.
    pub fn flat_features(&self) -> usize {
        self.flat_features
    }
}

// Only the convolutions change the shape; running the probe through batch
// norm would also update its running statistics.
fn probe_flat_features<B: Backend>(
    stages: &[ConvStage<B>],
    obs_shape: ObsShape,
    device: &B::Device,
) -> usize {
    let [c, h, w] = obs_shape.chw();
    let mut x = Tensor::<B, 4>::zeros([1, c, h, w], device);
    for stage in stages {
        x = stage.conv.forward(x);
    }
    let [_, c, h, w] = x.dims();
    c * h * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type B = NdArray;

    #[test]
    fn test_output_width_matches_config() {
        let device = Default::default();
        let config = FeatureExtractorConfig::new(32, 1);
        let cnn: MagicalCnn<B> = config.init(ObsShape::new(32, 32, 3), &device);
        let out = cnn.forward(Tensor::zeros([2, 3, 32, 32], &device));
        assert_eq!(out.dims(), [2, 32]);
        assert_eq!(cnn.features_dim(), 32);
    }

    #[test]
    fn test_flat_features_follow_downsampling() {
        let device = Default::default();
        let config = FeatureExtractorConfig::new(16, 1);
        // 32 -> 32 -> 16 -> 8 -> 4 -> 2, 64 channels at the end
        let cnn: MagicalCnn<B> = config.init(ObsShape::new(32, 32, 4), &device);
        assert_eq!(cnn.flat_features(), 64 * 2 * 2);
        // odd sizes round up: 20 -> 20 -> 10 -> 5 -> 3 -> 2
        let cnn: MagicalCnn<B> = config.init(ObsShape::new(20, 20, 4), &device);
        assert_eq!(cnn.flat_features(), 64 * 2 * 2);
    }

    #[test]
    fn test_width_multiplier_scales_channels() {
        let config = FeatureExtractorConfig::new(8, 3);
        assert_eq!(config.stage_channels(), [96, 192, 192, 192, 192]);
        let device = Default::default();
        let cnn: MagicalCnn<B> = config.init(ObsShape::new(16, 16, 3), &device);
        // 16 -> 16 -> 8 -> 4 -> 2 -> 1
        assert_eq!(cnn.flat_features(), 192);
    }
}
