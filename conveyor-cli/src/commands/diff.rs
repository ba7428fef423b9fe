//! `conveyor diff` — what rebundling would change, without writing.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use conveyor_stages::diff;

use super::CommandContext;

/// Arguments for `conveyor diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let ctx = CommandContext::resolve()?;
        let transformer = ctx.style_transformer();
        let bundler = ctx.script_bundler();

        let diffs = diff::diff_bundles(&ctx.root, &ctx.config, &transformer, bundler.as_ref())
            .context("diff failed")?;

        if diffs.is_empty() {
            println!("{} staged bundles are up to date", "✓".green());
            return Ok(());
        }

        for file_diff in &diffs {
            println!("{}", file_diff.path.display().to_string().cyan().bold());
            print!("{}", file_diff.unified_diff);
            println!();
        }
        println!("{} bundle(s) would change", diffs.len());
        Ok(())
    }
}
