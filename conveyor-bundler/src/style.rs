//! Style transform seam.
//!
//! The transform itself is opaque: three chained stdin→stdout passes (import
//! inlining with glob support, future-syntax normalization, shorthand
//! expansion) and, in production, a minifier pass. Conveyor only owns the
//! sequencing and the error surface.

use std::path::Path;

use conveyor_core::{Mode, ToolConfig};

use crate::error::BundleError;
use crate::tool::Tool;

/// Transforms one style entry's source into its bundled form.
pub trait StyleTransformer: Send + Sync {
    fn transform(&self, entry: &Path, source: &str) -> Result<String, BundleError>;
}

/// The external-toolchain transformer: configured passes run in order, each
/// with the entry's directory as working directory so relative `@import`s
/// resolve; the minifier runs last, production only.
pub struct ToolchainStyleTransformer {
    passes: Vec<Tool>,
    minifier: Tool,
    mode: Mode,
}

impl ToolchainStyleTransformer {
    pub fn from_config(tools: &ToolConfig, mode: Mode) -> Self {
        ToolchainStyleTransformer {
            passes: tools.style_passes.iter().map(|c| Tool::from_command(c)).collect(),
            minifier: Tool::from_command(&tools.style_minifier),
            mode,
        }
    }
}

impl StyleTransformer for ToolchainStyleTransformer {
    fn transform(&self, entry: &Path, source: &str) -> Result<String, BundleError> {
        let cwd = entry.parent().filter(|p| !p.as_os_str().is_empty());

        let mut css = source.as_bytes().to_vec();
        for pass in &self.passes {
            css = pass.filter(&css, cwd)?;
        }
        if self.mode.is_production() {
            css = self.minifier.filter(&css, cwd)?;
        }

        String::from_utf8(css).map_err(|_| BundleError::NonUtf8Output {
            program: self
                .passes
                .last()
                .unwrap_or(&self.minifier)
                .program()
                .to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::config::ToolConfig;

    fn sh_tools(passes: &[&str], minifier: &str) -> ToolConfig {
        ToolConfig {
            style_passes: passes
                .iter()
                .map(|s| vec!["sh".to_string(), "-c".to_string(), s.to_string()])
                .collect(),
            style_minifier: vec!["sh".to_string(), "-c".to_string(), minifier.to_string()],
            ..ToolConfig::default()
        }
    }

    #[test]
    #[cfg(unix)]
    fn passes_chain_in_order() {
        let tools = sh_tools(&["sed s/a/b/g", "sed s/b/c/g"], "cat");
        let transformer = ToolchainStyleTransformer::from_config(&tools, Mode::Development);
        let out = transformer.transform(Path::new("app.css"), "aaa").unwrap();
        assert_eq!(out, "ccc");
    }

    #[test]
    #[cfg(unix)]
    fn minifier_skipped_in_development() {
        let tools = sh_tools(&["cat"], "tr -d ' '");
        let transformer = ToolchainStyleTransformer::from_config(&tools, Mode::Development);
        let out = transformer
            .transform(Path::new("app.css"), "body { color: red }")
            .unwrap();
        assert_eq!(out, "body { color: red }");
    }

    #[test]
    #[cfg(unix)]
    fn minifier_applied_in_production() {
        let tools = sh_tools(&["cat"], "tr -d ' '");
        let transformer = ToolchainStyleTransformer::from_config(&tools, Mode::Production);
        let out = transformer
            .transform(Path::new("app.css"), "body { color: red }")
            .unwrap();
        assert_eq!(out, "body{color:red}");
        assert!(out.len() < "body { color: red }".len());
    }

    #[test]
    #[cfg(unix)]
    fn pass_failure_propagates() {
        let tools = sh_tools(&["exit 1"], "cat");
        let transformer = ToolchainStyleTransformer::from_config(&tools, Mode::Development);
        let err = transformer.transform(Path::new("app.css"), "body {}").unwrap_err();
        assert!(matches!(err, BundleError::ToolFailed { .. }), "got: {err}");
    }
}
