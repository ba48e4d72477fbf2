// Demonstration trajectories and their on-disk format
use crate::error::{BcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Shape of one image observation as the environment emits it
/// (height × width × channels, stacked frames concatenated on channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObsShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ObsShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self { height, width, channels }
    }

    pub fn numel(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Network input layout, `[channels, height, width]`.
    pub fn chw(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

impl fmt::Display for ObsShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Raw pixel observation in height-width-channel order. Deserialisation
/// goes through [`Observation::new`], so `pixels` always holds
/// `shape.numel()` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObservationRecord")]
pub struct Observation {
    pub shape: ObsShape,
    pub pixels: Vec<u8>,
}

#[derive(Deserialize)]
struct ObservationRecord {
    shape: ObsShape,
    pixels: Vec<u8>,
}

impl TryFrom<ObservationRecord> for Observation {
    type Error = BcError;

    fn try_from(record: ObservationRecord) -> Result<Self> {
        Observation::new(record.shape, record.pixels)
    }
}

impl Observation {
    pub fn new(shape: ObsShape, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != shape.numel() {
            return Err(BcError::ObservationShape {
                expected: format!("{} ({} values)", shape, shape.numel()),
                found: format!("{} values", pixels.len()),
            });
        }
        Ok(Self { shape, pixels })
    }

    pub fn zeros(shape: ObsShape) -> Self {
        Self { shape, pixels: vec![0; shape.numel()] }
    }

    /// Append this observation to `out` in channel-height-width order with
    /// pixel values scaled to `[0, 1]`.
    pub fn extend_chw(&self, out: &mut Vec<f32>) {
        let ObsShape { height, width, channels } = self.shape;
        out.reserve(self.pixels.len());
        for c in 0..channels {
            for y in 0..height {
                let row = y * width * channels;
                for x in 0..width {
                    out.push(self.pixels[row + x * channels + c] as f32 / 255.0);
                }
            }
        }
    }
}

/// One recorded episode: `obs` holds one more entry than `acts`, the last
/// being the state reached after the final action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub obs: Vec<Observation>,
    pub acts: Vec<u32>,
    #[serde(default)]
    pub rews: Vec<f32>,
}

impl Trajectory {
    pub fn new(obs: Vec<Observation>, acts: Vec<u32>) -> Self {
        Self { obs, acts, rews: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.acts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acts.is_empty()
    }
}

/// A saved demonstration: the trajectory, its final evaluation score and the
/// environment it was recorded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demonstration {
    pub env_name: String,
    pub trajectory: Trajectory,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DemoFormat {
    Json,
    Bincode,
}

impl DemoFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(DemoFormat::Json),
            Some("bin") => Some(DemoFormat::Bincode),
            _ => None,
        }
    }
}

impl Demonstration {
    pub fn load(path: &Path) -> Result<Self> {
        let format = DemoFormat::from_path(path)
            .ok_or_else(|| BcError::UnsupportedFormat(path.to_path_buf()))?;
        let file = File::open(path).map_err(|source| BcError::DemoIo {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let demo = match format {
            DemoFormat::Json => serde_json::from_reader(reader)?,
            DemoFormat::Bincode => bincode::deserialize_from(reader)?,
        };
        Ok(demo)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let format = DemoFormat::from_path(path)
            .ok_or_else(|| BcError::UnsupportedFormat(path.to_path_buf()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        match format {
            DemoFormat::Json => serde_json::to_writer(writer, self)?,
            DemoFormat::Bincode => bincode::serialize_into(writer, self)?,
        }
        Ok(())
    }
}

/// Expand the given paths into demonstration files. Directories contribute
/// every `.json`/`.bin` file they contain, in sorted order.
pub fn collect_demo_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && DemoFormat::from_path(p).is_some())
                .collect();
            if found.is_empty() {
                return Err(BcError::NoDemonstrations(path.clone()));
            }
            found.sort();
            out.extend(found);
        } else {
            out.push(path.clone());
        }
    }
    Ok(out)
}

/// Load every demonstration named by `paths`, logging progress.
pub fn load_demos(paths: &[PathBuf]) -> Result<Vec<Demonstration>> {
    let files = collect_demo_paths(paths)?;
    let total = files.len();
    let mut demos = Vec::with_capacity(total);
    for (num, path) in files.iter().enumerate() {
        log::info!("Loading {:?} ({}/{})", path, num + 1, total);
        demos.push(Demonstration::load(path)?);
    }
    Ok(demos)
}
