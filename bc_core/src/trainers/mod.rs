// Trainers Module

pub mod bc;
pub mod checkpoint;
pub mod learn;
pub mod settings;
pub mod stats;

pub use bc::{evaluate_policy, split_holdout, BcTrainer, EpochMetrics, EvalMetrics};
pub use checkpoint::{load_policy, save_policy, CheckpointManager, PolicyMeta};
pub use learn::{run_evaluation, run_inspect, run_training, summarise_demos, TrainingSummary};
pub use settings::BcSettings;
pub use stats::{CsvWriter, LogWriter, StatsReporter, StatsWriter};
