// Discrete-action policy: CNN embedding followed by an affine action head
use super::feature_extractor::{FeatureExtractorConfig, MagicalCnn};
use crate::actions::NUM_ACTIONS;
use crate::trajectory::ObsShape;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};

#[derive(Module, Debug)]
pub struct BcPolicy<B: Backend> {
    extractor: MagicalCnn<B>,
    action_head: Linear<B>,
}

impl<B: Backend> BcPolicy<B> {
    pub fn new(config: &FeatureExtractorConfig, obs_shape: ObsShape, device: &B::Device) -> Self {
        let extractor = config.init(obs_shape, device);
        let action_head = LinearConfig::new(extractor.features_dim(), NUM_ACTIONS).init(device);
        Self { extractor, action_head }
    }

    /// Action logits, `[batch, NUM_ACTIONS]`.
    pub fn forward(&self, obs: Tensor<B, 4>) -> Tensor<B, 2> {
        self.action_head.forward(self.extractor.forward(obs))
    }

    /// Greedy (argmax) action for every observation in the batch.
    pub fn act(&self, obs: Tensor<B, 4>) -> Vec<u32> {
        let n = obs.dims()[0];
        let actions = self.forward(obs).argmax(1).reshape([n]);
        actions.into_data().iter::<i64>().map(|a| a as u32).collect()
    }

    pub fn extractor(&self) -> &MagicalCnn<B> {
        &self.extractor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    #[test]
    fn test_policy_forward_pass() {
        type B = NdArray;
        let device = Default::default();
        let config = FeatureExtractorConfig::new(16, 1);
        let policy: BcPolicy<B> = BcPolicy::new(&config, ObsShape::new(16, 16, 3), &device);
        let logits = policy.forward(Tensor::zeros([3, 3, 16, 16], &device));
        assert_eq!(logits.dims(), [3, NUM_ACTIONS]);

        let actions = policy.act(Tensor::zeros([3, 3, 16, 16], &device));
        assert_eq!(actions.len(), 3);
        assert!(actions.iter().all(|&a| (a as usize) < NUM_ACTIONS));
    }
}
