// Learn module - entry points for training, offline evaluation and demo inspection

use super::bc::{evaluate_policy, split_holdout, BcTrainer, EpochMetrics, EvalMetrics};
use super::checkpoint::{load_policy, CheckpointManager, FINAL_POLICY_NAME, INTERMEDIATE_POLICY_NAME};
use super::settings::BcSettings;
use super::stats::{CsvWriter, LogWriter};
use crate::dataset::TransitionsDataset;
use crate::env_name::EnvName;
use crate::error::{BcError, Result};
use crate::trajectory::{load_demos, Demonstration};
use crate::utils::validate_scratch_directory;
use burn::backend::{Autodiff, NdArray};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type TrainBackend = Autodiff<NdArray>;
pub type InferenceBackend = NdArray;

const TRAINING_STATUS_FILE_NAME: &str = "training_status.json";
const CONFIGURATION_FILE_NAME: &str = "configuration.yaml";
const STATS_DIR_NAME: &str = "stats";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version_string() -> String {
    format!(
        "Version information:\n  \
        magical-bc: {},\n  \
        burn: {}",
        VERSION, "0.18"
    )
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub env_name: String,
    pub seed: u64,
    pub history: Vec<EpochMetrics>,
    pub final_policy: PathBuf,
}

/// Load demonstrations, train a BC policy and write snapshots to the
/// scratch directory.
pub fn run_training(settings: &BcSettings, demo_paths: &[PathBuf]) -> Result<TrainingSummary> {
    settings.validate()?;
    let checkpoint_settings = &settings.checkpoint_settings;
    let hp = &settings.hyperparameters;
    let scratch = &checkpoint_settings.scratch;

    // nothing touches scratch until the demos have loaded and split cleanly
    let demos = load_demos(demo_paths)?;
    let env_name = demos
        .first()
        .map(|d| d.env_name.clone())
        .ok_or(BcError::EmptyTrajectories)?;
    check_demo_envs(&demos, &env_name);

    let (train_data, validation_data) = split_holdout(&demos, hp.nholdout)?;
    check_obs_shape(&env_name, &train_data);

    validate_scratch_directory(scratch, checkpoint_settings.force)?;
    write_run_options(scratch, settings)?;

    let seed = settings.resolve_seed();
    log::info!("Run seed: {}", seed);

    let device = Default::default();
    let mut trainer = BcTrainer::<TrainBackend>::new(
        train_data,
        validation_data,
        settings.network_settings,
        hp.clone(),
        seed,
        &device,
    )?
    .with_env_name(&env_name);
    trainer.add_stats_writer(Box::new(LogWriter));
    trainer.add_stats_writer(Box::new(CsvWriter::new(&scratch.join(STATS_DIR_NAME))?));

    let checkpoints = CheckpointManager::new(scratch, checkpoint_settings.keep_checkpoints)?;
    let interval = checkpoint_settings.checkpoint_interval;
    let history = trainer.train(hp.n_epochs, |trainer, metrics| {
        let meta = trainer.meta();
        checkpoints.save_named(trainer.policy(), &meta, INTERMEDIATE_POLICY_NAME)?;
        if interval > 0 && metrics.epoch % interval == 0 {
            checkpoints.save_checkpoint(trainer.policy(), &meta, metrics.epoch)?;
        }
        Ok(())
    })?;

    let final_policy = checkpoints.save_named(trainer.policy(), &trainer.meta(), FINAL_POLICY_NAME)?;
    log::info!("Saved final policy to {:?}", final_policy);
    write_training_status(scratch, &history)?;

    Ok(TrainingSummary {
        env_name,
        seed,
        history,
        final_policy,
    })
}

fn check_demo_envs(demos: &[Demonstration], env_name: &str) {
    let others = demos.iter().filter(|d| d.env_name != env_name).count();
    if others > 0 {
        log::warn!(
            "{} of {} demonstrations were not recorded in {}",
            others,
            demos.len(),
            env_name
        );
    }
}

fn check_obs_shape(env_name: &str, dataset: &TransitionsDataset) {
    let preset = EnvName::parse(env_name)
        .ok()
        .and_then(|name| name.preprocessing())
        .map(|p| p.obs_shape());
    match preset {
        Some(expected) if expected != dataset.obs_shape() => log::warn!(
            "{} normally produces {} observations but the demos contain {}",
            env_name,
            expected,
            dataset.obs_shape()
        ),
        _ => {}
    }
}

fn write_run_options(output_dir: &Path, settings: &BcSettings) -> Result<()> {
    std::fs::write(output_dir.join(CONFIGURATION_FILE_NAME), settings.to_yaml()?)?;
    Ok(())
}

fn write_training_status(output_dir: &Path, history: &[EpochMetrics]) -> Result<()> {
    let last = history.last();
    let status = serde_json::json!({
        "completed": true,
        "epochs": history.len(),
        "final_train_loss": last.map(|m| m.train.loss),
        "final_train_accuracy": last.map(|m| m.train.accuracy),
        "final_validation_accuracy": last.and_then(|m| m.validation.as_ref().map(|v| v.accuracy)),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(
        output_dir.join(TRAINING_STATUS_FILE_NAME),
        serde_json::to_string_pretty(&status)?,
    )?;
    Ok(())
}

/// Action accuracy of a saved snapshot on the given demonstrations.
pub fn run_evaluation(snapshot: &Path, demo_paths: &[PathBuf], batch_size: usize) -> Result<EvalMetrics> {
    let device = Default::default();
    let (policy, meta) = load_policy::<InferenceBackend>(snapshot, &device)?;
    let demos = load_demos(demo_paths)?;
    let dataset = TransitionsDataset::from_trajectories(demos.iter().map(|d| &d.trajectory))?;
    if dataset.obs_shape() != meta.obs_shape {
        return Err(BcError::ObservationShape {
            expected: meta.obs_shape.to_string(),
            found: dataset.obs_shape().to_string(),
        });
    }
    let metrics = evaluate_policy(&policy, &dataset, batch_size, &device);
    log::info!(
        "Snapshot {:?}: accuracy {:.4}, loss {:.4} over {} transitions",
        snapshot,
        metrics.accuracy,
        metrics.loss,
        metrics.samples
    );
    Ok(metrics)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoGroupSummary {
    pub env_name: String,
    pub demos: usize,
    pub transitions: usize,
    pub mean_score: f32,
}

/// Per-environment counts and mean scores, sorted by environment name.
pub fn summarise_demos(demos: &[Demonstration]) -> Vec<DemoGroupSummary> {
    let mut groups: BTreeMap<&str, (usize, usize, f32)> = BTreeMap::new();
    for demo in demos {
        let entry = groups.entry(demo.env_name.as_str()).or_default();
        entry.0 += 1;
        entry.1 += demo.trajectory.len();
        entry.2 += demo.score;
    }
    groups
        .into_iter()
        .map(|(env_name, (count, transitions, score))| DemoGroupSummary {
            env_name: env_name.to_string(),
            demos: count,
            transitions,
            mean_score: score / count as f32,
        })
        .collect()
}

pub fn run_inspect(demo_paths: &[PathBuf]) -> Result<Vec<DemoGroupSummary>> {
    let demos = load_demos(demo_paths)?;
    Ok(summarise_demos(&demos))
}
