// Checkpoint management system
use crate::error::Result;
use crate::networks::{BcPolicy, FeatureExtractorConfig};
use crate::trajectory::ObsShape;
use burn::module::Module;
use burn::record::{FullPrecisionSettings, PrettyJsonFileRecorder};
use burn::tensor::backend::Backend;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const FINAL_POLICY_NAME: &str = "policy";
pub const INTERMEDIATE_POLICY_NAME: &str = "policy-intermediate";

const WEIGHTS_EXTENSION: &str = "json";
const META_SUFFIX: &str = ".meta.json";

/// Everything needed to rebuild a policy's architecture before its weights
/// are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMeta {
    pub network: FeatureExtractorConfig,
    pub obs_shape: ObsShape,
    pub num_actions: usize,
    #[serde(default)]
    pub env_name: Option<String>,
    #[serde(default)]
    pub epoch: usize,
}

fn recorder() -> PrettyJsonFileRecorder<FullPrecisionSettings> {
    PrettyJsonFileRecorder::<FullPrecisionSettings>::new()
}

// `scratch/policy.json` and `scratch/policy` name the same snapshot.
fn snapshot_stem(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(WEIGHTS_EXTENSION) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

pub fn weights_path(path: &Path) -> PathBuf {
    snapshot_stem(path).with_extension(WEIGHTS_EXTENSION)
}

pub fn meta_path(path: &Path) -> PathBuf {
    let mut os = snapshot_stem(path).into_os_string();
    os.push(META_SUFFIX);
    PathBuf::from(os)
}

/// Write the policy weights (batch-norm running statistics included) and
/// the architecture sidecar next to each other.
pub fn save_policy<B: Backend>(policy: &BcPolicy<B>, meta: &PolicyMeta, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    policy.clone().save_file(weights_path(path), &recorder())?;
    fs::write(meta_path(path), serde_json::to_string_pretty(meta)?)?;
    Ok(())
}

pub fn load_meta(path: &Path) -> Result<PolicyMeta> {
    let content = fs::read_to_string(meta_path(path))?;
    Ok(serde_json::from_str(&content)?)
}

/// Rebuild the architecture from the sidecar and load the saved record into
/// it.
pub fn load_policy<B: Backend>(path: &Path, device: &B::Device) -> Result<(BcPolicy<B>, PolicyMeta)> {
    let meta = load_meta(path)?;
    let policy = BcPolicy::<B>::new(&meta.network, meta.obs_shape, device)
        .load_file(weights_path(path), &recorder(), device)?;
    Ok((policy, meta))
}

/// Numbered per-epoch checkpoints with a retention limit, plus the named
/// intermediate and final snapshots.
pub struct CheckpointManager {
    checkpoint_dir: PathBuf,
    keep_checkpoints: usize,
}

impl CheckpointManager {
    pub fn new(checkpoint_dir: &Path, keep_checkpoints: usize) -> Result<Self> {
        fs::create_dir_all(checkpoint_dir)?;
        Ok(Self {
            checkpoint_dir: checkpoint_dir.to_path_buf(),
            keep_checkpoints,
        })
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    pub fn save_named<B: Backend>(&self, policy: &BcPolicy<B>, meta: &PolicyMeta, name: &str) -> Result<PathBuf> {
        let path = self.checkpoint_dir.join(name);
        save_policy(policy, meta, &path)?;
        Ok(weights_path(&path))
    }

    pub fn save_checkpoint<B: Backend>(&self, policy: &BcPolicy<B>, meta: &PolicyMeta, epoch: usize) -> Result<PathBuf> {
        let path = self.save_named(policy, meta, &format!("{}-{}", FINAL_POLICY_NAME, epoch))?;
        log::info!("Checkpoint saved: {:?}", path);
        self.cleanup_old_checkpoints()?;
        Ok(path)
    }

    /// Numbered checkpoints currently on disk, newest first.
    pub fn list_checkpoints(&self) -> Result<Vec<(usize, PathBuf)>> {
        let re = Regex::new(&format!(
            r"^{}-(\d+)\.{}$",
            regex::escape(FINAL_POLICY_NAME),
            WEIGHTS_EXTENSION
        ))?;
        let mut checkpoints = Vec::new();
        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            if let Some(epoch) = re
                .captures(name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok())
            {
                checkpoints.push((epoch, entry.path()));
            }
        }
        checkpoints.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(checkpoints)
    }

    // keep_checkpoints == 0 keeps every numbered checkpoint
    fn cleanup_old_checkpoints(&self) -> Result<()> {
        if self.keep_checkpoints == 0 {
            return Ok(());
        }
        let checkpoints = self.list_checkpoints()?;
        for (_, old) in checkpoints.iter().skip(self.keep_checkpoints) {
            fs::remove_file(old)?;
            let meta = meta_path(old);
            if meta.exists() {
                fs::remove_file(meta)?;
            }
            log::debug!("Removed old checkpoint: {:?}", old);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_paths() {
        let p = Path::new("scratch/policy.json");
        assert_eq!(weights_path(p), PathBuf::from("scratch/policy.json"));
        assert_eq!(meta_path(p), PathBuf::from("scratch/policy.meta.json"));
        let p = Path::new("scratch/policy-intermediate");
        assert_eq!(weights_path(p), PathBuf::from("scratch/policy-intermediate.json"));
        assert_eq!(meta_path(p), PathBuf::from("scratch/policy-intermediate.meta.json"));
    }
}
