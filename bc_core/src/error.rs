// Error types shared across the crate
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BcError {
    #[error("cannot build a transitions dataset from an empty trajectory collection")]
    EmptyTrajectories,
    #[error(
        "trajectory {index} has {observations} observations and {actions} actions \
         (expected exactly one more observation than actions)"
    )]
    TrajectoryLength {
        index: usize,
        observations: usize,
        actions: usize,
    },
    #[error("observation shape mismatch: expected {expected}, found {found}")]
    ObservationShape { expected: String, found: String },
    #[error("action {0} is outside the robot action space")]
    InvalidAction(u32),
    #[error("trajectory {index} step {step} has action {action}, outside the robot action space")]
    TrajectoryAction { index: usize, step: usize, action: u32 },
    #[error("env name '{0}' does not match <prefix>-<Demo|Test...>[-suffix]-v<N>")]
    InvalidEnvName(String),
    #[error("no demonstrations found in {0:?}")]
    NoDemonstrations(PathBuf),
    #[error("unsupported demonstration format {0:?} (expected .json or .bin)")]
    UnsupportedFormat(PathBuf),
    #[error("directory {0:?} already exists and is not empty; use --force to overwrite")]
    ScratchExists(PathBuf),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("cannot read demonstration {path:?}: {source}")]
    DemoIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("checkpoint error: {0}")]
    Recorder(String),
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<burn::record::RecorderError> for BcError {
    fn from(err: burn::record::RecorderError) -> Self {
        BcError::Recorder(format!("{:?}", err))
    }
}

pub type Result<T> = std::result::Result<T, BcError>;
