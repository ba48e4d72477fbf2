// Behavioural cloning for the MAGICAL imitation-learning benchmark suite

pub mod actions;
pub mod cli;
pub mod dataset;
pub mod env_name;
pub mod error;
pub mod networks;
pub mod trainers;
pub mod trajectory;
pub mod utils;

// Re-export main types
pub use dataset::{Transition, TransitionsDataset};
pub use error::{BcError, Result};
pub use networks::{BcPolicy, FeatureExtractorConfig, MagicalCnn};
pub use trainers::{run_evaluation, run_inspect, run_training, BcSettings, BcTrainer};
pub use trajectory::{Demonstration, ObsShape, Observation, Trajectory};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        let version = trainers::learn::get_version_string();
        assert!(version.contains("magical-bc"));
    }
}
