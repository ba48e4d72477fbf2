use bc_core::networks::{BcPolicy, FeatureExtractorConfig, MagicalCnn};
use bc_core::ObsShape;
use burn::backend::ndarray::NdArray;
use burn::tensor::Tensor;

type B = NdArray;

#[test]
fn test_output_width_independent_of_resolution() {
    let device = Default::default();
    let config = FeatureExtractorConfig::new(24, 1);

    let small: MagicalCnn<B> = config.init(ObsShape::new(16, 16, 3), &device);
    let large: MagicalCnn<B> = config.init(ObsShape::new(48, 40, 3), &device);
    assert_ne!(small.flat_features(), large.flat_features());

    let out_small = small.forward(Tensor::zeros([2, 3, 16, 16], &device));
    let out_large = large.forward(Tensor::zeros([2, 3, 48, 40], &device));
    assert_eq!(out_small.dims(), [2, 24]);
    assert_eq!(out_large.dims(), [2, 24]);
}

#[test]
fn test_shape_inference_is_deterministic() {
    let device = Default::default();
    let config = FeatureExtractorConfig::new(32, 2);
    let shape = ObsShape::new(24, 24, 12);
    let first: MagicalCnn<B> = config.init(shape, &device);
    let second: MagicalCnn<B> = config.init(shape, &device);
    assert_eq!(first.flat_features(), second.flat_features());
    // 24 -> 24 -> 12 -> 6 -> 3 -> 2, 128 channels
    assert_eq!(first.flat_features(), 128 * 2 * 2);
}

#[test]
fn test_lores_stack_observation_shape() {
    let device = Default::default();
    let config = FeatureExtractorConfig::default();
    let cnn: MagicalCnn<B> = config.init(ObsShape::new(96, 96, 12), &device);
    // 96 -> 96 -> 48 -> 24 -> 12 -> 6
    assert_eq!(cnn.flat_features(), 128 * 6 * 6);
    assert_eq!(cnn.features_dim(), 128);
}

#[test]
fn test_policy_embeds_extractor() {
    let device = Default::default();
    let config = FeatureExtractorConfig::new(10, 1);
    let policy: BcPolicy<B> = BcPolicy::new(&config, ObsShape::new(8, 8, 1), &device);
    assert_eq!(policy.extractor().features_dim(), 10);
    let logits = policy.forward(Tensor::zeros([1, 1, 8, 8], &device));
    assert_eq!(logits.dims(), [1, bc_core::actions::NUM_ACTIONS]);
}
