//! # conveyor-bundler
//!
//! The external-tool seam: style and script transforms are black boxes
//! invoked as child processes behind narrow traits, so the stage code never
//! knows which toolchain is installed and tests can substitute fakes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use conveyor_bundler::{script, ToolchainStyleTransformer, StyleTransformer};
//! use conveyor_core::{BuildConfig, Environment, Mode};
//!
//! fn bundle_everything(root: &Path, config: &BuildConfig) {
//!     let env = Environment::for_mode(Mode::Production);
//!     let styles = ToolchainStyleTransformer::from_config(&config.tools, env.mode);
//!     let scripts = script::from_config(root, &env, &config.tools);
//!     for entry in &config.bundles {
//!         let _ = styles.transform(entry, "body {}");
//!         let _ = scripts.bundle(entry);
//!     }
//! }
//! ```

pub mod cache;
pub mod error;
pub mod script;
pub mod style;
pub mod tool;

pub use cache::{BundleCacheFile, CachedBundle};
pub use error::BundleError;
pub use script::{CachedBundler, ScriptBundle, ScriptBundler, WorkerBundler};
pub use style::{StyleTransformer, ToolchainStyleTransformer};
pub use tool::Tool;
