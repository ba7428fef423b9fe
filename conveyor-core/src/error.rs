//! Error types for conveyor-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse build config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    ///
    /// A missing config is a fatal startup error; every command needs the
    /// bundle list and copy mappings.
    #[error("build config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// The config parsed but describes an unusable pipeline.
    #[error("invalid build config at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
