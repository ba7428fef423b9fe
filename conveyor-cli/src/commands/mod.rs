pub mod build;
pub mod diff;
pub mod size;
pub mod stage;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use conveyor_bundler::{script, ScriptBundler, ToolchainStyleTransformer};
use conveyor_core::{BuildConfig, Environment};
use conveyor_stages::{EntryOutcome, StageReport};

/// Project root, environment, and config shared by every command.
pub(crate) struct CommandContext {
    pub root: PathBuf,
    pub env: Environment,
    pub config: BuildConfig,
}

impl CommandContext {
    pub fn resolve() -> Result<Self> {
        let root = std::env::current_dir().context("could not determine current directory")?;
        let env = Environment::from_env();
        let config = BuildConfig::load_at(&root)
            .context("failed to load build config — expected assets/config.yaml")?;
        Ok(CommandContext { root, env, config })
    }

    pub fn style_transformer(&self) -> ToolchainStyleTransformer {
        ToolchainStyleTransformer::from_config(&self.config.tools, self.env.mode)
    }

    pub fn script_bundler(&self) -> Box<dyn ScriptBundler> {
        script::from_config(&self.root, &self.env, &self.config.tools)
    }
}

/// One stage summary line plus its entry failures.
pub(crate) fn print_stage_report(report: &StageReport) {
    let glyph = if report.has_failures() {
        "✗".red()
    } else {
        "✓".green()
    };
    println!(
        "{glyph} {} — {} written, {} skipped, {} failed",
        report.stage,
        report.written(),
        report.skipped(),
        report.failed()
    );
    for outcome in &report.outcomes {
        if let EntryOutcome::Failed { entry, error } = outcome {
            println!("  {} {}: {error}", "!".red(), entry.display());
        }
    }
}
