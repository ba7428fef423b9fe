//! Deployment environment — resolved once at startup, immutable thereafter.
//!
//! The resolver reads three process variables:
//!
//! | Variable     | Meaning                              | Default       |
//! |--------------|--------------------------------------|---------------|
//! | `NODE_ENV`   | `development` or `production`        | `development` |
//! | `ASSET_HOST` | CDN host prefix for asset rewriting  | unset         |
//! | `PORT`       | live-reload server listen port       | `8080`        |
//!
//! Every stage receives an [`Environment`] by reference; nothing else in the
//! workspace touches `std::env`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default listen port for the live-reload server.
pub const DEFAULT_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Deployment mode. Anything other than an explicit `production` resolves to
/// [`Mode::Development`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

impl From<&str> for Mode {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("production") {
            Mode::Production
        } else {
            Mode::Development
        }
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Immutable snapshot of the deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub mode: Mode,
    /// CDN host (scheme + authority) prepended to `/assets/...` references in
    /// production. `None` disables the rewrite stage.
    pub asset_host: Option<String>,
    /// Listen port for the live-reload server.
    pub port: u16,
}

impl Environment {
    /// Resolve from process variables. Call once at startup.
    ///
    /// A malformed `PORT` logs a warning and falls back to [`DEFAULT_PORT`];
    /// an empty `ASSET_HOST` counts as unset.
    pub fn from_env() -> Self {
        let mode = std::env::var("NODE_ENV")
            .map(|v| Mode::from(v.as_str()))
            .unwrap_or_default();

        let asset_host = std::env::var("ASSET_HOST")
            .ok()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("ignoring malformed PORT value {raw:?}; using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        Environment {
            mode,
            asset_host,
            port,
        }
    }

    /// An environment with the given mode and all other fields defaulted.
    /// Intended for tests and single-stage invocations.
    pub fn for_mode(mode: Mode) -> Self {
        Environment {
            mode,
            asset_host: None,
            port: DEFAULT_PORT,
        }
    }

    /// `for_mode` plus an asset host, for exercising the CDN rewrite.
    pub fn with_asset_host(mode: Mode, host: impl Into<String>) -> Self {
        Environment {
            mode,
            asset_host: Some(host.into()),
            port: DEFAULT_PORT,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_str_is_case_insensitive() {
        assert_eq!(Mode::from("production"), Mode::Production);
        assert_eq!(Mode::from("PRODUCTION"), Mode::Production);
        assert_eq!(Mode::from("development"), Mode::Development);
    }

    #[test]
    fn unknown_mode_string_resolves_to_development() {
        assert_eq!(Mode::from("staging"), Mode::Development);
        assert_eq!(Mode::from(""), Mode::Development);
    }

    #[test]
    fn default_mode_is_development() {
        assert_eq!(Mode::default(), Mode::Development);
        assert!(!Mode::default().is_production());
    }

    #[test]
    fn mode_display() {
        assert_eq!(Mode::Development.to_string(), "development");
        assert_eq!(Mode::Production.to_string(), "production");
    }

    #[test]
    fn for_mode_has_defaults() {
        let env = Environment::for_mode(Mode::Production);
        assert!(env.mode.is_production());
        assert!(env.asset_host.is_none());
        assert_eq!(env.port, DEFAULT_PORT);
    }

    #[test]
    fn with_asset_host_sets_host() {
        let env = Environment::with_asset_host(Mode::Production, "https://cdn.example.com");
        assert_eq!(env.asset_host.as_deref(), Some("https://cdn.example.com"));
    }
}
