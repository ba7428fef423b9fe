//! `conveyor build` — the full pipeline in dependency order.

use anyhow::{Context, Result};
use clap::Args;

use conveyor_stages::{pipeline, BuildScope};

use super::{print_stage_report, CommandContext};
use crate::commands::size::print_size_table;

/// Arguments for `conveyor build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Emit the machine-readable pipeline report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl BuildArgs {
    pub fn run(self) -> Result<()> {
        let ctx = CommandContext::resolve()?;
        let transformer = ctx.style_transformer();
        let bundler = ctx.script_bundler();

        let report = pipeline::run(
            &ctx.root,
            &ctx.env,
            &ctx.config,
            &transformer,
            bundler.as_ref(),
            BuildScope::Full,
        )
        .context("build failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("mode: {}", ctx.env.mode);
        for stage in &report.stages {
            print_stage_report(stage);
        }
        if let Some(sizes) = &report.sizes {
            println!();
            print_size_table(sizes);
        }
        Ok(())
    }
}
