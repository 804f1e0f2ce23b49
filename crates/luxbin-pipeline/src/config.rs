//! Pipeline configuration.
//!
//! Supports loading configuration from:
//! 1. A YAML file (`~/.luxbin/config.yaml` unless another path is given)
//! 2. Environment variables with the `LUXBIN_` prefix
//!
//! Environment variables override the file, which overrides the defaults.
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::StagePlan;

/// IBM systems the pipeline runs on by default, in node order.
pub const DEFAULT_BACKENDS: [&str; 3] = ["ibm_fez", "ibm_torino", "ibm_marrakesh"];

/// Nodes every pipeline needs.
pub const NODE_COUNT: usize = 3;

/// Comma-separated backend names.
pub const ENV_BACKENDS: &str = "LUXBIN_BACKENDS";
/// Start message of the full pipeline.
pub const ENV_START_MESSAGE: &str = "LUXBIN_START_MESSAGE";
/// Loop record file.
pub const ENV_LOOP_LOG: &str = "LUXBIN_LOOP_LOG";
/// Loop status file.
pub const ENV_STATUS_FILE: &str = "LUXBIN_STATUS_FILE";

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Backend names for nodes A, B and C.
    pub backends: Vec<String>,
    /// Shots per stage kind.
    pub shots: ShotConfig,
    /// First message of a full pipeline run.
    pub start_message: String,
    /// Echo rounds before the relay.
    pub echo_rounds: usize,
    /// Ping-pong rallies after the consensus.
    pub rallies: usize,
    /// Persistent loop settings.
    pub persistent: PersistentConfig,
    /// Local simulator settings.
    pub simulator: SimulatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backends: DEFAULT_BACKENDS.iter().map(|s| s.to_string()).collect(),
            shots: ShotConfig::default(),
            start_message: "NICHO".to_string(),
            echo_rounds: 2,
            rallies: 4,
            persistent: PersistentConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

/// Shots per stage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotConfig {
    /// Echo rounds, including the closing echo.
    pub echo: u32,
    /// Relay legs.
    pub relay: u32,
    /// Each consensus ballot.
    pub consensus: u32,
    /// Ping-pong rallies.
    pub pingpong: u32,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            echo: 200,
            relay: 500,
            consensus: 1000,
            pingpong: 500,
        }
    }
}

/// Persistent loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentConfig {
    /// Message of the first loop and of every loop after an error.
    pub start_message: String,
    /// Echo rounds per loop.
    pub echo_rounds: usize,
    /// Rallies per loop.
    pub rallies: usize,
    /// JSON array of loop records.
    pub log_file: PathBuf,
    /// Plain-text status log.
    pub status_file: PathBuf,
    /// Pause between successful loops.
    pub loop_pause_secs: u64,
    /// Pause after a failed loop.
    pub error_pause_secs: u64,
    /// Stop after this many loops.
    pub max_loops: Option<u64>,
}

fn default_loop_dir() -> PathBuf {
    std::env::temp_dir().join("luxbin-quantum-internet")
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            start_message: "NICHE".to_string(),
            echo_rounds: 1,
            rallies: 2,
            log_file: default_loop_dir().join("luxbin_loop_log.json"),
            status_file: default_loop_dir().join("luxbin_loop_status.txt"),
            loop_pause_secs: 10,
            error_pause_secs: 30,
            max_loops: None,
        }
    }
}

/// Local simulator settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Base RNG seed; node `i` uses `seed + i`.
    pub seed: Option<u64>,
    /// Depolarizing probability per gate operand.
    pub depolarizing: f64,
    /// Readout flip probability per bit.
    pub readout_error: f64,
}

impl PipelineConfig {
    /// `~/.luxbin/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".luxbin").join("config.yaml"))
    }

    /// Parse YAML without validating.
    pub fn from_yaml(yaml: &str) -> PipelineResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load with the following precedence:
    /// 1. Environment overrides
    /// 2. `path`, which must exist, or the default file if present
    /// 3. Default values
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let config = match path {
            Some(path) => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    debug!(path = %path.display(), "loading configuration");
                    Self::from_yaml(&std::fs::read_to_string(path)?)?
                }
                None => Self::default(),
            },
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `LUXBIN_*` variables from the process environment.
    pub fn merge_env(self) -> Self {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `LUXBIN_*` variables resolved through `lookup`.
    ///
    /// Only variables that are present override the current values.
    pub fn merge_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_BACKENDS) {
            self.backends = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup(ENV_START_MESSAGE) {
            self.start_message = v;
        }
        if let Some(v) = lookup(ENV_LOOP_LOG) {
            self.persistent.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_STATUS_FILE) {
            self.persistent.status_file = PathBuf::from(v);
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.backends.len() != NODE_COUNT {
            return Err(PipelineError::Config(format!(
                "expected {NODE_COUNT} backends, got {}",
                self.backends.len()
            )));
        }
        if let Some(blank) = self.backends.iter().find(|b| b.trim().is_empty()) {
            return Err(PipelineError::Config(format!(
                "backend name must not be blank: {blank:?}"
            )));
        }

        let shots = [
            ("echo", self.shots.echo),
            ("relay", self.shots.relay),
            ("consensus", self.shots.consensus),
            ("pingpong", self.shots.pingpong),
        ];
        if let Some((stage, _)) = shots.iter().find(|(_, n)| *n == 0) {
            return Err(PipelineError::Config(format!(
                "shots.{stage} must be greater than 0"
            )));
        }

        if self.start_message.is_empty() {
            return Err(PipelineError::Config(
                "start_message must not be empty".to_string(),
            ));
        }
        if self.persistent.start_message.is_empty() {
            return Err(PipelineError::Config(
                "persistent.start_message must not be empty".to_string(),
            ));
        }

        for (name, p) in [
            ("simulator.depolarizing", self.simulator.depolarizing),
            ("simulator.readout_error", self.simulator.readout_error),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(PipelineError::Config(format!(
                    "{name} must be a probability, got {p}"
                )));
            }
        }

        Ok(())
    }

    /// Stage plan of a full pipeline run.
    pub fn full_plan(&self) -> StagePlan {
        StagePlan {
            echo_rounds: self.echo_rounds,
            rallies: self.rallies,
            shots: self.shots,
        }
    }

    /// Stage plan of one persistent loop.
    pub fn persistent_plan(&self) -> StagePlan {
        StagePlan {
            echo_rounds: self.persistent.echo_rounds,
            rallies: self.persistent.rallies,
            shots: self.shots,
        }
    }
}
