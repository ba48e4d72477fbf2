// Benchmark environment names and their observation preprocessing presets
use crate::error::{BcError, Result};
use crate::trajectory::ObsShape;
use regex::Regex;

const ENV_NAME_PATTERN: &str =
    r"^(?P<name_prefix>[^-]+)(?P<demo_test_spec>-(Demo|Test[^-]*))(?P<env_name_suffix>(-[^-]+)*)(?P<version_suffix>-v\d+)$";

/// Observation preprocessing applied by an environment name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocessing {
    /// 96x96 RGB, four frames stacked along the channel axis.
    LoResStack,
    /// 84x84 greyscale, four frames stacked. Only meant for debugging.
    AtariStyle,
}

impl Preprocessing {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "LoResStack" => Some(Preprocessing::LoResStack),
            "AtariStyle" => Some(Preprocessing::AtariStyle),
            _ => None,
        }
    }

    pub fn obs_shape(self) -> ObsShape {
        match self {
            Preprocessing::LoResStack => ObsShape::new(96, 96, 3 * 4),
            Preprocessing::AtariStyle => ObsShape::new(84, 84, 4),
        }
    }
}

/// Parsed environment name of the form
/// `<prefix>-<Demo|Test...>[-<suffix>]-v<N>`, e.g.
/// `MoveToCorner-Demo-LoResStack-v0` or `ClusterColour-TestAll-v0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvName {
    pub env_name: String,
    pub name_prefix: String,
    pub demo_test_spec: String,
    pub env_name_suffix: String,
    pub version_suffix: String,
    pub demo_env_name: String,
    pub is_test: bool,
}

impl EnvName {
    pub fn parse(env_name: &str) -> Result<Self> {
        let re = Regex::new(ENV_NAME_PATTERN)?;
        let caps = re
            .captures(env_name)
            .ok_or_else(|| BcError::InvalidEnvName(env_name.to_string()))?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or("").to_string();

        let name_prefix = group("name_prefix");
        let demo_test_spec = group("demo_test_spec");
        let env_name_suffix = group("env_name_suffix");
        let version_suffix = group("version_suffix");
        let demo_env_name = format!("{}-Demo{}{}", name_prefix, env_name_suffix, version_suffix);
        let is_test = demo_test_spec.starts_with("-Test");

        if !is_test && demo_env_name != env_name {
            return Err(BcError::InvalidEnvName(env_name.to_string()));
        }

        Ok(Self {
            env_name: env_name.to_string(),
            name_prefix,
            demo_test_spec,
            env_name_suffix,
            version_suffix,
            demo_env_name,
            is_test,
        })
    }

    /// Suffix components without their leading dashes.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.env_name_suffix.split('-').filter(|s| !s.is_empty())
    }

    pub fn preprocessing(&self) -> Option<Preprocessing> {
        self.suffixes().find_map(Preprocessing::from_suffix)
    }
}
