//! Build configuration — `assets/config.yaml`.
//!
//! Loaded once, synchronously, at process start; immutable for the process
//! lifetime. A missing or malformed file is a fatal startup error.
//!
//! ```yaml
//! bundles:
//!   - assets/styles/app.css
//!   - assets/scripts/app.js
//! copies:
//!   "assets/images/*": public/assets/images
//! tools:               # optional — defaults mirror the stock toolchain
//!   bundler: incremental
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::config_path;

// ---------------------------------------------------------------------------
// BuildConfig
// ---------------------------------------------------------------------------

/// The build configuration: ordered bundle entries plus copy mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Bundle entry points, in declaration order. Extension decides the
    /// handling stage (`.css` → styles, `.js` → scripts, anything else is
    /// skipped).
    pub bundles: Vec<PathBuf>,

    /// Source glob → destination directory, copied verbatim.
    #[serde(default)]
    pub copies: BTreeMap<String, PathBuf>,

    /// External tool commands for every transform seam.
    #[serde(default)]
    pub tools: ToolConfig,
}

impl BuildConfig {
    /// Load `<root>/assets/config.yaml`.
    ///
    /// Returns `ConfigError::ConfigNotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed.
    pub fn load_at(root: &Path) -> Result<BuildConfig, ConfigError> {
        let path = config_path(root);
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound { path });
        }
        let contents = std::fs::read_to_string(&path)?;
        let config: BuildConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Parse { path: path.clone(), source: e })?;
        config.tools.validate(&path)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Bundler strategy selection
// ---------------------------------------------------------------------------

/// Which script-bundler strategy the pipeline is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BundlerChoice {
    /// One external invocation per entry, gated by a JSON bundle cache.
    /// Minifies in-bundle and emits `bundles/map.json` in production.
    #[default]
    Incremental,
    /// A long-lived worker process receiving bundle requests over stdio.
    /// Production minification is a separate post-bundle pass.
    Persistent,
}

// ---------------------------------------------------------------------------
// ToolConfig
// ---------------------------------------------------------------------------

/// External command lines for each transform seam. Each value is
/// `[program, arg...]`; stage code appends entry/file paths as needed.
///
/// Defaults name the stock toolchain; overriding them in `config.yaml` is how
/// tests (and unconventional projects) substitute their own tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// The three style passes, applied in order: import inlining,
    /// future-syntax normalization, shorthand expansion.
    pub style_passes: Vec<Vec<String>>,
    /// Production-only style minifier.
    pub style_minifier: Vec<String>,
    /// Script bundler strategy.
    pub bundler: BundlerChoice,
    /// Bundler command for the incremental strategy.
    pub bundle_command: Vec<String>,
    /// Worker command for the persistent strategy.
    pub worker_command: Vec<String>,
    /// Production-only post-bundle script minifier (persistent strategy).
    pub script_minifier: Vec<String>,
    /// Lossless PNG optimizer, invoked per file.
    pub png_optimizer: Vec<String>,
    /// Lossy JPEG optimizer, invoked per file, bounded to a quality ceiling.
    pub jpeg_optimizer: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            style_passes: vec![
                vec!["postcss-import".into()],
                vec!["postcss-cssnext".into()],
                vec!["rucksack-css".into()],
            ],
            style_minifier: vec!["csso".into()],
            bundler: BundlerChoice::Incremental,
            bundle_command: vec!["browserify".into()],
            worker_command: vec!["watchify".into()],
            script_minifier: vec!["uglifyjs".into()],
            png_optimizer: vec!["optipng".into()],
            jpeg_optimizer: vec!["jpegoptim".into(), "--max=60".into()],
        }
    }
}

impl ToolConfig {
    /// Reject command lines with no program word.
    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let commands: Vec<(&str, &Vec<String>)> = vec![
            ("style_minifier", &self.style_minifier),
            ("bundle_command", &self.bundle_command),
            ("worker_command", &self.worker_command),
            ("script_minifier", &self.script_minifier),
            ("png_optimizer", &self.png_optimizer),
            ("jpeg_optimizer", &self.jpeg_optimizer),
        ];
        for (name, command) in commands {
            if command.is_empty() {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    reason: format!("tools.{name} must name a program"),
                });
            }
        }
        for (i, pass) in self.style_passes.iter().enumerate() {
            if pass.is_empty() {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    reason: format!("tools.style_passes[{i}] must name a program"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
