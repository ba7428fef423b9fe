//! Error types for conveyor-stages.

use std::path::PathBuf;

use thiserror::Error;

use conveyor_bundler::BundleError;
use conveyor_core::ConfigError;

/// Stage-fatal errors: anything here aborts the enclosing pipeline run.
/// Per-entry transform failures are NOT errors — they are recorded as
/// [`crate::report::EntryOutcome::Failed`] and the stage proceeds.
#[derive(Debug, Error)]
pub enum StageError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error from the external-tool seam.
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// An error from configuration loading.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// JSON serialization error (revision manifest).
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A copy-stage source glob failed to parse.
    #[error("invalid copy glob: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A copy-stage glob match could not be read.
    #[error("copy glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// Staging-root traversal failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// CDN rewrite pattern failed to compile.
    #[error("rewrite pattern error: {0}")]
    Regex(#[from] regex::Error),
}

/// Convenience constructor for [`StageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StageError {
    StageError::Io {
        path: path.into(),
        source,
    }
}
