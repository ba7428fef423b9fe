//! Conveyor core library — environment resolution, build configuration,
//! staging-path helpers, errors.
//!
//! Public API surface:
//! - [`env`] — [`Environment`] and [`Mode`]
//! - [`config`] — [`BuildConfig`] loader
//! - [`paths`] — staging-root path helpers
//! - [`types`] — asset classification
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{BuildConfig, BundlerChoice, ToolConfig};
pub use env::{Environment, Mode};
pub use error::ConfigError;
pub use types::AssetKind;
