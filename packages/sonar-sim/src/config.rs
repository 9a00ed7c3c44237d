//! config.rs — TOML configuration for the simulator
//!
//! Sections: `[array]`, `[matcher]`, `[scenario]`. A missing file falls back
//! to the default shipped with the package.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use sonar_types::{ArrayGeometry, GeometryError};

use crate::matcher::MatchConfig;
use crate::scenarios::{ScenarioConfig, ScenarioError};

pub const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid array: {0}")]
    Geometry(#[from] GeometryError),
    #[error("invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayConfig {
    pub lateral_a_m: f64,
    pub lateral_b_m: f64,
    pub vertical_m: f64,
    pub sample_rate_hz: u32,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            lateral_a_m: -0.15,
            lateral_b_m: 0.25,
            vertical_m: 0.20,
            sample_rate_hz: 200_000,
        }
    }
}

impl ArrayConfig {
    pub fn geometry(&self) -> Result<ArrayGeometry, GeometryError> {
        ArrayGeometry::new(self.lateral_a_m, self.lateral_b_m, self.vertical_m, self.sample_rate_hz)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub array: ArrayConfig,
    #[serde(default)]
    pub matcher: MatchConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl FullConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg: FullConfig = toml::from_str(s)?;
        cfg.array.geometry()?;
        cfg.scenario.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml(&s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{} not found, using built-in defaults", path.display());
                Self::from_toml(DEFAULT_CONFIG)
            }
            Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchStrategy;
    use crate::scenarios::Preset;

    #[test]
    fn shipped_default_parses() {
        let cfg = FullConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(cfg.array, ArrayConfig::default());
        assert_eq!(cfg.matcher, MatchConfig::default());
        assert_eq!(cfg.scenario, ScenarioConfig::Preset { name: Preset::Reference });
    }

    #[test]
    fn omitted_sections_take_defaults() {
        let cfg = FullConfig::from_toml("[matcher]\nstrategy = \"exhaustive\"\n").unwrap();
        assert_eq!(cfg.array, ArrayConfig::default());
        assert_eq!(cfg.matcher.strategy, MatchStrategy::Exhaustive);
        assert_eq!(cfg.matcher.dedup_tolerance_m, 0.25);
    }

    #[test]
    fn zero_sample_rate_fails_to_load() {
        let err = FullConfig::from_toml(
            "[array]\nlateral_a_m = -0.15\nlateral_b_m = 0.25\nvertical_m = 0.2\nsample_rate_hz = 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Geometry(GeometryError::ZeroSampleRate)));
    }

    #[test]
    fn unknown_preset_is_a_parse_error() {
        let err = FullConfig::from_toml("[scenario]\nkind = \"preset\"\nname = \"nope\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let cfg = FullConfig::load(Path::new("/nonexistent/sonar-sim.toml")).unwrap();
        assert_eq!(cfg, FullConfig::from_toml(DEFAULT_CONFIG).unwrap());
    }
}
