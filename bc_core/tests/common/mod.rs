// Synthetic demonstrations shared by the integration tests
#![allow(dead_code)]

use bc_core::{Demonstration, ObsShape, Observation, Trajectory};
use std::path::{Path, PathBuf};

pub const ENV_NAME: &str = "MoveToCorner-Demo-v0";

pub fn small_shape() -> ObsShape {
    ObsShape::new(8, 8, 1)
}

/// A trajectory whose action is fully determined by observation brightness:
/// dark frames map to action 0 and bright frames to action 5.
pub fn learnable_trajectory(n_acts: usize, offset: usize) -> Trajectory {
    let shape = small_shape();
    let mut obs = Vec::with_capacity(n_acts + 1);
    let mut acts = Vec::with_capacity(n_acts);
    for t in 0..=n_acts {
        let bright = (t + offset) % 2 == 1;
        let value = if bright { 255 } else { 0 };
        obs.push(Observation::new(shape, vec![value; shape.numel()]).unwrap());
        if t < n_acts {
            acts.push(if bright { 5 } else { 0 });
        }
    }
    Trajectory::new(obs, acts)
}

pub fn demo(n_acts: usize, offset: usize, score: f32) -> Demonstration {
    Demonstration {
        env_name: ENV_NAME.to_string(),
        trajectory: learnable_trajectory(n_acts, offset),
        score,
    }
}

/// Write `count` demonstrations into `dir` and return the directory path.
pub fn write_demos(dir: &Path, count: usize) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    for i in 0..count {
        let ext = if i % 2 == 0 { "json" } else { "bin" };
        demo(6 + i, i, i as f32 / count as f32)
            .save(&dir.join(format!("demo-{i:02}.{ext}")))
            .unwrap();
    }
    dir.to_path_buf()
}
