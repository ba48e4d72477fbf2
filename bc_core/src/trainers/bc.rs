// Behavioural cloning trainer: minibatch cross-entropy on expert actions
use super::checkpoint::PolicyMeta;
use super::settings::BcHyperparameters;
use super::stats::{StatsReporter, StatsWriter};
use crate::actions::NUM_ACTIONS;
use crate::dataset::TransitionsDataset;
use crate::error::{BcError, Result};
use crate::networks::{BcPolicy, FeatureExtractorConfig};
use crate::trajectory::Demonstration;
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, PartialEq)]
pub struct EvalMetrics {
    pub loss: f32,
    pub accuracy: f32,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train: EvalMetrics,
    pub validation: Option<EvalMetrics>,
}

/// Split demonstrations into training transitions and, when `nholdout > 0`,
/// validation transitions built from the first `nholdout` demos.
pub fn split_holdout(
    demos: &[Demonstration],
    nholdout: usize,
) -> Result<(TransitionsDataset, Option<TransitionsDataset>)> {
    if nholdout >= demos.len() {
        return Err(BcError::Settings(format!(
            "nholdout ({}) leaves no training demonstrations out of {}",
            nholdout,
            demos.len()
        )));
    }
    let (holdout, train) = demos.split_at(nholdout);
    let train = TransitionsDataset::from_trajectories(train.iter().map(|d| &d.trajectory))?;
    let validation = if holdout.is_empty() {
        None
    } else {
        Some(TransitionsDataset::from_trajectories(
            holdout.iter().map(|d| &d.trajectory),
        )?)
    };
    Ok((train, validation))
}

fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let n = targets.dims()[0];
    let predictions = logits.argmax(1).reshape([n]);
    predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Mean loss and action accuracy of `policy` over `dataset`. Batch norm runs
/// in whatever mode the backend implies, so pass an inference-mode model.
pub fn evaluate_policy<B: Backend>(
    policy: &BcPolicy<B>,
    dataset: &TransitionsDataset,
    batch_size: usize,
    device: &B::Device,
) -> EvalMetrics {
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut total_loss = 0.0f32;
    let mut correct = 0usize;
    for indices in dataset.sequential_batches(batch_size) {
        let batch = dataset.batch::<B>(&indices, device);
        let logits = policy.forward(batch.obs);
        let loss = loss_fn.forward(logits.clone(), batch.acts.clone());
        total_loss += loss.into_scalar().elem::<f32>() * indices.len() as f32;
        correct += count_correct(logits, batch.acts);
    }
    let samples = dataset.len();
    EvalMetrics {
        loss: total_loss / samples.max(1) as f32,
        accuracy: correct as f32 / samples.max(1) as f32,
        samples,
    }
}

pub struct BcTrainer<B: AutodiffBackend> {
    policy: BcPolicy<B>,
    optimizer: OptimizerAdaptor<Adam, BcPolicy<B>, B>,
    train_data: TransitionsDataset,
    validation_data: Option<TransitionsDataset>,
    hyperparameters: BcHyperparameters,
    network: FeatureExtractorConfig,
    env_name: Option<String>,
    stats: StatsReporter,
    rng: StdRng,
    epoch: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> BcTrainer<B> {
    pub fn new(
        train_data: TransitionsDataset,
        validation_data: Option<TransitionsDataset>,
        network: FeatureExtractorConfig,
        hyperparameters: BcHyperparameters,
        seed: u64,
        device: &B::Device,
    ) -> Result<Self> {
        if let Some(val) = &validation_data {
            if val.obs_shape() != train_data.obs_shape() {
                return Err(BcError::ObservationShape {
                    expected: train_data.obs_shape().to_string(),
                    found: val.obs_shape().to_string(),
                });
            }
        }
        let policy = BcPolicy::new(&network, train_data.obs_shape(), device);
        let mut adam = AdamConfig::new();
        if hyperparameters.weight_decay > 0.0 {
            adam = adam.with_weight_decay(Some(WeightDecayConfig::new(hyperparameters.weight_decay)));
        }
        let optimizer = adam.init::<B, BcPolicy<B>>();

        log::info!(
            "BC trainer: {} training / {} validation transitions, observations {}",
            train_data.len(),
            validation_data.as_ref().map_or(0, |v| v.len()),
            train_data.obs_shape()
        );

        Ok(Self {
            policy,
            optimizer,
            train_data,
            validation_data,
            hyperparameters,
            network,
            env_name: None,
            stats: StatsReporter::new(),
            rng: StdRng::seed_from_u64(seed),
            epoch: 0,
            device: device.clone(),
        })
    }

    pub fn with_env_name(mut self, env_name: &str) -> Self {
        self.env_name = Some(env_name.to_string());
        self
    }

    pub fn add_stats_writer(&mut self, writer: Box<dyn StatsWriter>) {
        self.stats.add_writer(writer);
    }

    pub fn policy(&self) -> &BcPolicy<B> {
        &self.policy
    }

    /// The policy with autodiff stripped; batch norm uses running statistics.
    pub fn inference_policy(&self) -> BcPolicy<B::InnerBackend> {
        self.policy.valid()
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn meta(&self) -> PolicyMeta {
        PolicyMeta {
            network: self.network,
            obs_shape: self.train_data.obs_shape(),
            num_actions: NUM_ACTIONS,
            env_name: self.env_name.clone(),
            epoch: self.epoch,
        }
    }

    /// One pass over the shuffled training set.
    pub fn train_epoch(&mut self) -> Result<EpochMetrics> {
        let lr = self.hyperparameters.learning_rate;
        let batches = self
            .train_data
            .shuffled_batches(self.hyperparameters.batch_size, &mut self.rng);
        let loss_fn = CrossEntropyLossConfig::new().init(&self.device);

        let mut policy = self.policy.clone();
        let mut total_loss = 0.0f32;
        let mut correct = 0usize;
        for indices in batches {
            let batch = self.train_data.batch::<B>(&indices, &self.device);
            let logits = policy.forward(batch.obs);
            let loss = loss_fn.forward(logits.clone(), batch.acts.clone());

            total_loss += loss.clone().into_scalar().elem::<f32>() * indices.len() as f32;
            correct += count_correct(logits.detach(), batch.acts);

            let grads = GradientsParams::from_grads(loss.backward(), &policy);
            policy = self.optimizer.step(lr, policy, grads);
        }
        self.policy = policy;
        self.epoch += 1;

        let samples = self.train_data.len();
        let train = EvalMetrics {
            loss: total_loss / samples as f32,
            accuracy: correct as f32 / samples as f32,
            samples,
        };
        let validation = self.validate();

        self.stats.add_stat("loss/train", train.loss);
        self.stats.add_stat("accuracy/train", train.accuracy);
        if let Some(val) = &validation {
            self.stats.add_stat("loss/validation", val.loss);
            self.stats.add_stat("accuracy/validation", val.accuracy);
        }
        self.stats.write_stats(self.epoch as u64)?;

        Ok(EpochMetrics {
            epoch: self.epoch,
            train,
            validation,
        })
    }

    pub fn validate(&self) -> Option<EvalMetrics> {
        let dataset = self.validation_data.as_ref()?;
        Some(evaluate_policy(
            &self.inference_policy(),
            dataset,
            self.hyperparameters.batch_size,
            &self.device,
        ))
    }

    /// Train for `n_epochs`, calling `on_epoch_end` after each one. An error
    /// from the callback stops training.
    pub fn train<F>(&mut self, n_epochs: usize, mut on_epoch_end: F) -> Result<Vec<EpochMetrics>>
    where
        F: FnMut(&Self, &EpochMetrics) -> Result<()>,
    {
        let mut history = Vec::with_capacity(n_epochs);
        for _ in 0..n_epochs {
            let metrics = self.train_epoch()?;
            on_epoch_end(self, &metrics)?;
            history.push(metrics);
        }
        Ok(history)
    }
}
