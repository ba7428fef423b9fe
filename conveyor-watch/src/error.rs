use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watch runtime and the reload protocol.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("config error: {0}")]
    Config(#[from] conveyor_core::ConfigError),

    #[error("stage error: {0}")]
    Stage(#[from] conveyor_stages::StageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("reload protocol error: {0}")]
    Protocol(String),

    #[error("reload server is not running on port {port}")]
    ServerNotRunning { port: u16 },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WatchError {
    WatchError::Io {
        path: path.into(),
        source,
    }
}
