//! Configuration System
//!
//! Loads run parameters from `lane.toml` so experiments can be repeated
//! without recompiling. Every section and field is optional and falls back to
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::metric::DEFAULT_BASELINE_TRIALS;
use crate::simulation::SimulationOptions;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "lane.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corridor: CorridorConfig,
    pub dynamics: DynamicsConfig,
    pub run: RunConfig,
}

/// Corridor geometry and population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    /// Rows across the corridor
    pub rows: usize,
    /// Columns along the walking axis
    pub columns: usize,
    pub agents: usize,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            rows: 40,
            columns: 100,
            agents: 1000,
        }
    }
}

/// Agent behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Probability of preferring a straight-ahead move
    pub soberness: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self { soberness: 1.0 }
    }
}

/// Run length, seeding and output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub iterations: u64,
    pub seed: u64,
    pub baseline_trials: usize,
    pub record_snapshots: bool,
    pub snapshot_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 300,
            seed: 42,
            baseline_trials: DEFAULT_BASELINE_TRIALS,
            record_snapshots: true,
            snapshot_interval: 1,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        content.parse()
    }

    /// Load configuration from the default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject parameter combinations no run can satisfy
    pub fn validate(&self) -> Result<(), ConfigError> {
        let corridor = &self.corridor;
        if corridor.rows == 0 || corridor.columns == 0 {
            return Err(ConfigError::Invalid(format!(
                "corridor dimensions must be positive, got {}x{}",
                corridor.rows, corridor.columns
            )));
        }
        let cells = corridor.rows.checked_mul(corridor.columns).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "corridor of {}x{} cells is too large",
                corridor.rows, corridor.columns
            ))
        })?;
        if corridor.agents > cells {
            return Err(ConfigError::Invalid(format!(
                "{} agents do not fit in {} cells",
                corridor.agents, cells
            )));
        }
        self.options()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Engine options derived from this configuration
    pub fn options(&self) -> SimulationOptions {
        SimulationOptions {
            soberness: self.dynamics.soberness,
            baseline_trials: self.run.baseline_trials,
            record_snapshots: self.run.record_snapshots,
            snapshot_interval: self.run.snapshot_interval,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
