//! Error types for the `bimatrix` binary.
//!
//! [`CliError`] wraps every failure a subcommand can hit so `main` can
//! propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the `bimatrix` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Session settings or the round table could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: bimatrix_core::config::ConfigError,
    },

    /// The export could not be built or written.
    #[error("export error: {source}")]
    Export {
        /// The underlying export error.
        #[from]
        source: bimatrix_core::export::ExportError,
    },

    /// The recorded events file is not a JSON array of group rounds.
    #[error("invalid events file {}: {source}", path.display())]
    Events {
        /// Path of the events file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Writing a JSON report failed.
    #[error("report error: {source}")]
    Report {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Reading input or writing output failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
