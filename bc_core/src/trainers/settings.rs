// Settings module - behavioural cloning run configuration
use crate::error::{BcError, Result};
use crate::networks::FeatureExtractorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BcSettings {
    #[serde(default)]
    pub network_settings: FeatureExtractorConfig,
    #[serde(default)]
    pub hyperparameters: BcHyperparameters,
    #[serde(default)]
    pub checkpoint_settings: CheckpointSettings,
    #[serde(default)]
    pub env_settings: EnvironmentSettings,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BcHyperparameters {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_n_epochs")]
    pub n_epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub weight_decay: f32,
    /// The first `nholdout` demonstrations are kept aside for validation.
    #[serde(default)]
    pub nholdout: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSettings {
    #[serde(default = "default_scratch")]
    pub scratch: PathBuf,
    /// Numbered checkpoints to retain, newest first (0 keeps all).
    #[serde(default = "default_keep_checkpoints")]
    pub keep_checkpoints: usize,
    /// Save a numbered checkpoint every this many epochs (0 disables).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// -1 picks a random seed at startup.
    #[serde(default = "default_seed")]
    pub seed: i64,
}

fn default_batch_size() -> usize { 32 }
fn default_n_epochs() -> usize { 100 }
fn default_learning_rate() -> f64 { 1e-3 }
fn default_scratch() -> PathBuf { PathBuf::from("scratch") }
fn default_keep_checkpoints() -> usize { 5 }
fn default_checkpoint_interval() -> usize { 10 }
fn default_seed() -> i64 { -1 }

impl Default for BcHyperparameters {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            n_epochs: default_n_epochs(),
            learning_rate: default_learning_rate(),
            weight_decay: 0.0,
            nholdout: 0,
        }
    }
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            scratch: default_scratch(),
            keep_checkpoints: default_keep_checkpoints(),
            checkpoint_interval: default_checkpoint_interval(),
            force: false,
        }
    }
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self { seed: default_seed() }
    }
}

impl BcSettings {
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: BcSettings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let hp = &self.hyperparameters;
        if hp.batch_size == 0 {
            return Err(BcError::Settings("batch_size must be positive".into()));
        }
        if !(hp.learning_rate > 0.0) {
            return Err(BcError::Settings("learning_rate must be positive".into()));
        }
        let net = &self.network_settings;
        if net.features_dim == 0 || net.width == 0 {
            return Err(BcError::Settings(
                "network features_dim and width must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The configured seed, or a random one when it is negative.
    pub fn resolve_seed(&self) -> u64 {
        if self.env_settings.seed < 0 {
            use rand::Rng;
            rand::thread_rng().gen_range(0..10000)
        } else {
            self.env_settings.seed as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "hyperparameters:\n  batch_size: 64\nnetwork_settings:\n  width: 1\n";
        let settings: BcSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.hyperparameters.batch_size, 64);
        assert_eq!(settings.hyperparameters.n_epochs, 100);
        assert_eq!(settings.network_settings.width, 1);
        assert_eq!(settings.network_settings.features_dim, 128);
        assert_eq!(settings.checkpoint_settings.scratch, PathBuf::from("scratch"));
        assert_eq!(settings.env_settings.seed, -1);
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bc.yaml");
        let mut settings = BcSettings::default();
        settings.hyperparameters.nholdout = 2;
        std::fs::write(&path, settings.to_yaml().unwrap()).unwrap();
        assert_eq!(BcSettings::from_yaml(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut settings = BcSettings::default();
        settings.hyperparameters.batch_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = BcSettings::default();
        settings.network_settings.width = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_fixed_seed_is_kept() {
        let mut settings = BcSettings::default();
        settings.env_settings.seed = 42;
        assert_eq!(settings.resolve_seed(), 42);
        settings.env_settings.seed = -1;
        assert!(settings.resolve_seed() < 10000);
    }
}
