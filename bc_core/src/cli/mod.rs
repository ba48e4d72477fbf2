// Command-line interface for magical-bc
use crate::error::Result;
use crate::trainers::learn::{get_version_string, run_evaluation, run_inspect, run_training};
use crate::trainers::BcSettings;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "magical-bc")]
#[command(version)]
#[command(about = "Behavioural cloning on MAGICAL benchmark demonstrations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Use behavioural cloning to train a convnet policy on DEMOS
    Train(TrainArgs),

    /// Measure how often a saved policy picks the demonstrated action
    Evaluate {
        /// Path to saved policy
        #[arg(long, default_value = "scratch/policy.json")]
        snapshot: PathBuf,

        /// Evaluation batch size
        #[arg(long = "batch-size", default_value_t = 32)]
        batch_size: usize,

        /// Demonstration files or directories
        #[arg(required = true, num_args = 1..)]
        demos: Vec<PathBuf>,
    },

    /// Summarise demonstrations per environment
    Inspect {
        /// Demonstration files or directories
        #[arg(required = true, num_args = 1..)]
        demos: Vec<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// YAML settings file; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to save snapshots in
    #[arg(long)]
    pub scratch: Option<PathBuf>,

    /// Batch size for training
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    /// Use the first NHOLDOUT demos only for validation
    #[arg(long)]
    pub nholdout: Option<usize>,

    /// Number of epochs of training
    #[arg(long)]
    pub nepochs: Option<usize>,

    /// Adam learning rate
    #[arg(long = "learning-rate")]
    pub learning_rate: Option<f64>,

    /// Seed for shuffling (-1 for random)
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Overwrite an existing non-empty scratch directory
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Demonstration files or directories
    #[arg(required = true, num_args = 1..)]
    pub demos: Vec<PathBuf>,
}

impl TrainArgs {
    /// Settings from the config file (or defaults) with flag overrides applied.
    pub fn to_settings(&self, debug: bool) -> Result<BcSettings> {
        let mut settings = match &self.config {
            Some(path) => BcSettings::from_yaml(path)?,
            None => BcSettings::default(),
        };
        let hp = &mut settings.hyperparameters;
        if let Some(v) = self.batch_size {
            hp.batch_size = v;
        }
        if let Some(v) = self.nholdout {
            hp.nholdout = v;
        }
        if let Some(v) = self.nepochs {
            hp.n_epochs = v;
        }
        if let Some(v) = self.learning_rate {
            hp.learning_rate = v;
        }
        if let Some(v) = &self.scratch {
            settings.checkpoint_settings.scratch = v.clone();
        }
        if let Some(v) = self.seed {
            settings.env_settings.seed = v;
        }
        settings.checkpoint_settings.force |= self.force;
        settings.debug |= debug;
        settings.validate()?;
        Ok(settings)
    }
}

pub fn print_banner() {
    println!(
        r#"
╔═══════════════════════════════════════════════╗
║     MAGICAL behavioural cloning (Rust)        ║
╚═══════════════════════════════════════════════╝
"#
    );
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train(args) => {
            print_banner();
            let settings = args.to_settings(cli.debug)?;
            log::debug!("Configuration:\n{}", settings.to_yaml()?);
            let summary = run_training(&settings, &args.demos)?;
            if let Some(last) = summary.history.last() {
                println!(
                    "Trained {} epochs on {}: train accuracy {:.4}",
                    summary.history.len(),
                    summary.env_name,
                    last.train.accuracy
                );
            }
            println!("Saved a model to {:?}", summary.final_policy);
        }
        Commands::Evaluate { snapshot, batch_size, demos } => {
            let metrics = run_evaluation(&snapshot, &demos, batch_size)?;
            println!(
                "Final action accuracy for {:?}: {:.4} ({} transitions, loss {:.4})",
                snapshot, metrics.accuracy, metrics.samples, metrics.loss
            );
        }
        Commands::Inspect { demos } => {
            println!("{:<45} {:>6} {:>12} {:>11}", "env", "demos", "transitions", "mean_score");
            for group in run_inspect(&demos)? {
                println!(
                    "{:<45} {:>6} {:>12} {:>11.4}",
                    group.env_name, group.demos, group.transitions, group.mean_score
                );
            }
        }
        Commands::Version => println!("{}", get_version_string()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_train() {
        let cli = Cli::parse_from([
            "magical-bc",
            "train",
            "--batch-size", "16",
            "--nholdout", "2",
            "--seed", "-1",
            "demos/a.json",
            "demos/b.json",
        ]);
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.demos.len(), 2);
        let settings = args.to_settings(cli.debug).unwrap();
        assert_eq!(settings.hyperparameters.batch_size, 16);
        assert_eq!(settings.hyperparameters.nholdout, 2);
        assert_eq!(settings.hyperparameters.n_epochs, 100);
        assert_eq!(settings.env_settings.seed, -1);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bc.yaml");
        std::fs::write(&config, "hyperparameters:\n  n_epochs: 7\n  batch_size: 8\n").unwrap();
        let cli = Cli::parse_from([
            "magical-bc",
            "--debug",
            "train",
            "--config",
            config.to_str().unwrap(),
            "--batch-size",
            "4",
            "demos",
        ]);
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let settings = args.to_settings(cli.debug).unwrap();
        assert_eq!(settings.hyperparameters.n_epochs, 7);
        assert_eq!(settings.hyperparameters.batch_size, 4);
        assert!(settings.debug);
    }

    #[test]
    fn test_train_requires_demos() {
        assert!(Cli::try_parse_from(["magical-bc", "train"]).is_err());
    }

    #[test]
    fn test_evaluate_default_snapshot() {
        let cli = Cli::parse_from(["magical-bc", "evaluate", "demos"]);
        match cli.command {
            Commands::Evaluate { snapshot, batch_size, .. } => {
                assert_eq!(snapshot, PathBuf::from("scratch/policy.json"));
                assert_eq!(batch_size, 32);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
