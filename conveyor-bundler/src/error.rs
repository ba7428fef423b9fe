//! Error types for conveyor-bundler.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from invoking external transform tools.
#[derive(Debug, Error)]
pub enum BundleError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tool binary could not be launched at all (usually not installed).
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool launched but its stdio streams failed mid-invocation.
    #[error("'{program}' stream failure: {source}")]
    Pipe {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited non-zero.
    #[error("'{program}' failed ({status}): {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The tool produced output that is not valid UTF-8.
    #[error("'{program}' produced non-UTF-8 output")]
    NonUtf8Output { program: String },

    /// Worker bundler protocol violation (closed stream, bad reply, refusal).
    #[error("bundler worker protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error (bundle cache, worker protocol).
    #[error("bundler JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`BundleError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BundleError {
    BundleError::Io {
        path: path.into(),
        source,
    }
}
