//! Configuration loading and typed config structures for a bimatrix session.
//!
//! A session is described by a small YAML file naming the round table (a
//! CSV file, see [`crate::round_table`]) plus export, randomness, and logging
//! settings. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//!
//! ```yaml
//! name: "pd-continuous"
//! config_file: "rounds.csv"
//! export:
//!   ticks_per_second: 2
//!   max_group_size: 2
//! randomness:
//!   seed: 42
//! logging:
//!   level: "info"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::export::ExportOptions;
use crate::round_table::RoundTable;

/// Environment variable that overrides `config_file`. Its value is used
/// as given; relative paths resolve against the working directory.
pub const ROUND_TABLE_ENV: &str = "BIMATRIX_CONFIG_FILE";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse session YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The round table is not well-formed CSV or lacks a required column.
    #[error("failed to read round table: {source}")]
    Csv {
        /// The underlying CSV error.
        source: csv::Error,
    },

    /// A round-table field holds a value that cannot be used.
    #[error("round {round}: invalid {field} value {value:?}: {reason}")]
    Parse {
        /// 1-based round (data row) number.
        round: usize,
        /// Column name.
        field: &'static str,
        /// The offending text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested round lies beyond the table; the round is inactive.
    #[error("no configuration for round {round} (table has {available} rounds)")]
    Missing {
        /// The requested 1-based round number.
        round: u32,
        /// Number of rounds the table defines.
        available: usize,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl From<csv::Error> for ConfigError {
    fn from(source: csv::Error) -> Self {
        Self::Csv { source }
    }
}

/// Top-level session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Human-readable session name.
    #[serde(default = "default_session_name")]
    pub name: String,

    /// Path of the round table CSV. Relative paths are resolved against the
    /// directory of the session file when loaded with [`Self::from_file`].
    pub config_file: PathBuf,

    /// Export table settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Initial-decision randomness.
    #[serde(default)]
    pub randomness: RandomnessConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SessionConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// A relative `config_file` is resolved against the directory of the
    /// session file. A [`ROUND_TABLE_ENV`] override is taken as given, so a
    /// relative override stays relative to the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.config_file = round_table_path(
            &config.config_file,
            path.parent(),
            std::env::var(ROUND_TABLE_ENV).ok(),
        );
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// [`ROUND_TABLE_ENV`] overrides the `config_file` entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.config_file =
            round_table_path(&config.config_file, None, std::env::var(ROUND_TABLE_ENV).ok());
        Ok(config)
    }

    /// Load the round table named by `config_file`.
    ///
    /// # Errors
    ///
    /// Propagates any [`ConfigError`] raised while reading or parsing the
    /// table.
    pub fn load_round_table(&self) -> Result<RoundTable, ConfigError> {
        RoundTable::from_file(&self.config_file)
    }
}

fn round_table_path(
    configured: &Path,
    session_dir: Option<&Path>,
    overridden: Option<String>,
) -> PathBuf {
    if let Some(path) = overridden {
        tracing::info!(path, "round table path overridden from environment");
        return PathBuf::from(path);
    }
    match session_dir {
        Some(dir) if configured.is_relative() => dir.join(configured),
        _ => configured.to_path_buf(),
    }
}

/// Export table configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    /// Sampling rate of continuous-time rounds.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,

    /// Number of player column groups in every export row.
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

impl ExportConfig {
    /// Resampler options for these settings.
    pub const fn options(&self) -> ExportOptions {
        ExportOptions {
            ticks_per_second: self.ticks_per_second,
            max_group_size: self.max_group_size,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: default_ticks_per_second(),
            max_group_size: default_max_group_size(),
        }
    }
}

/// Initial-decision randomness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RandomnessConfig {
    /// Fixed seed for reproducible initial decisions; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_session_name() -> String {
    "bimatrix".to_owned()
}

const fn default_ticks_per_second() -> u32 {
    crate::export::TICKS_PER_SECOND
}

const fn default_max_group_size() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_owned()
}
