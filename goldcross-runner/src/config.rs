//! Serializable run configuration.
//!
//! A [`RunConfig`] captures everything needed to reproduce a backtest:
//! strategy parameters, the universe, the benchmark, and where the bars
//! come from. Configs load from TOML and hash to a content-addressable
//! run id, so identical configs always land in the same artifact directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use goldcross_core::config::StrategyParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("universe is empty")]
    EmptyUniverse,
    #[error("duplicate symbol '{0}' in universe")]
    DuplicateSymbol(String),
    #[error("benchmark '{0}' is also listed in the universe")]
    BenchmarkInUniverse(String),
    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] goldcross_core::config::ConfigError),
    #[error("synthetic data requires bar_count >= 1")]
    EmptySyntheticRange,
}

/// Where the bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataConfig {
    /// One `{SYMBOL}.csv` file per symbol under `dir`, columns
    /// date,open,high,low,close,volume.
    Csv { dir: PathBuf },

    /// Deterministic random walks. Two runs with the same seed and
    /// universe see byte-identical bars.
    Synthetic {
        seed: u64,
        start_date: NaiveDate,
        bar_count: usize,
    },
}

/// Serializable configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Symbols to trade, in any order; the runner sorts them.
    pub universe: Vec<String>,

    /// Benchmark symbol for the regime filter. Not traded. When absent
    /// the regime filter stays open.
    #[serde(default)]
    pub benchmark: Option<String>,

    pub data: DataConfig,

    /// Strategy parameters; omitted fields take their defaults.
    #[serde(default)]
    pub strategy: StrategyParams,
}

impl RunConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let text = fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.universe.is_empty() {
            return Err(RunConfigError::EmptyUniverse);
        }
        let mut sorted = self.universe.clone();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(RunConfigError::DuplicateSymbol(pair[0].clone()));
            }
        }
        if let Some(bench) = &self.benchmark {
            if self.universe.contains(bench) {
                return Err(RunConfigError::BenchmarkInUniverse(bench.clone()));
            }
        }
        if let DataConfig::Synthetic { bar_count, .. } = &self.data {
            if *bar_count == 0 {
                return Err(RunConfigError::EmptySyntheticRange);
            }
        }
        self.strategy.validate()?;
        Ok(())
    }

    /// Deterministic hash id for this configuration.
    ///
    /// Two runs with identical configs share a RunId, so re-running a
    /// config overwrites its own artifact directory rather than piling
    /// up duplicates.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
