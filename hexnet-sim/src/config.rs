// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration of a simulation run.
//!
//! Configuration is gathered from several sources. Where the same value is
//! supplied by more than one, the later source in this list wins:
//!
//! 1. Default values.
//! 1. A TOML configuration file.
//! 1. Environment variables prefixed with `HEXNET_`. Nested keys are
//!    separated by a double underscore, so `HEXNET_SYSTEM__SEED=3` sets
//!    `system.seed`.
//! 1. The command line.
//!
//! A configuration file only needs to give the values that differ from the
//! defaults:
//!
//! ```toml
//! [system]
//! seed = 3
//!
//! [system.system_size]
//! width = 4
//! height = 4
//!
//! [experiment]
//! num_samples = 2
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hexnet_engine::sim_error;
use hexnet_engine::types::{SimError, SimResult};
use hexnet_models::config::SystemConfig;
use serde::{Deserialize, Serialize};

/// Prefix of the environment variables that are read.
pub const ENV_PREFIX: &str = "HEXNET_";

/// How long to run and where to put the results.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Ticks to run before the first sample.
    pub warmup_duration: u64,

    /// Ticks in each sample.
    pub sample_duration: u64,
    pub num_samples: usize,
    pub results_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            warmup_duration: 1_000,
            sample_duration: 10_000,
            num_samples: 1,
            results_dir: PathBuf::from("results"),
        }
    }
}

impl ExperimentConfig {
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.warmup_duration + self.sample_duration * self.num_samples as u64
    }

    pub fn validate(&self) -> SimResult {
        if self.sample_duration == 0 {
            return sim_error!("experiment.sample_duration must be at least 1");
        }
        Ok(())
    }
}

/// Where log messages go.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: log::Level,

    /// Entities whose full name matches get `level`, all others only log
    /// errors.
    pub filter_regex: String,

    /// Log file, `stdout` when not given.
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log::Level::Warn,
            filter_regex: String::new(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub system: SystemConfig,
    pub experiment: ExperimentConfig,
    pub log: LogConfig,
}

impl SimConfig {
    /// The layered sources before extraction.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(SimConfig::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Read the defaults, `config_file` and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, SimError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return sim_error!(format!(
                    "configuration file {} not found",
                    path.display()
                ));
            }
        }

        let config: SimConfig = match Self::figment(config_file).extract() {
            Ok(config) => config,
            Err(e) => return sim_error!(format!("invalid configuration: {e}")),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult {
        self.system.validate()?;
        self.experiment.validate()
    }
}
