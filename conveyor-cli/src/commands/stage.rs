//! Single-stage commands: `conveyor clean|styles|scripts|copy`.

use anyhow::{Context, Result};

use conveyor_stages::{pipeline, BuildScope, StageKind};

use super::{print_stage_report, CommandContext};

pub fn run(kind: StageKind) -> Result<()> {
    let ctx = CommandContext::resolve()?;
    let transformer = ctx.style_transformer();
    let bundler = ctx.script_bundler();

    let report = pipeline::run(
        &ctx.root,
        &ctx.env,
        &ctx.config,
        &transformer,
        bundler.as_ref(),
        BuildScope::Stage(kind),
    )
    .with_context(|| format!("{kind} stage failed"))?;

    for stage in &report.stages {
        print_stage_report(stage);
    }
    Ok(())
}
