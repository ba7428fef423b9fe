//! Shared pipeline entrypoint used by the CLI and the watch runtime.
//!
//! A full build runs the stages in dependency order: clean, then the
//! independent bundling group joined in parallel, then the two strictly
//! sequential rewrite stages, then compression, then the size report. The
//! composer enforces the ordering explicitly; nothing is inferred.

use std::path::Path;

use conveyor_bundler::{ScriptBundler, StyleTransformer};
use conveyor_core::{BuildConfig, Environment};

use crate::error::StageError;
use crate::report::{PipelineReport, StageKind, StageReport};
use crate::{cdn, clean, compress, copy, revision, scripts, size, styles};

/// Scope for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildScope {
    /// The whole deployable build.
    Full,
    /// A single named stage (watch rebuilds, per-stage CLI commands).
    Stage(StageKind),
}

/// Run the pipeline for a scope.
///
/// This is the canonical build entrypoint for both `conveyor build` and the
/// watch runtime's rebuild processor. The completion of the returned
/// `Result` is the completion signal: every composed stage has finished.
pub fn run(
    root: &Path,
    env: &Environment,
    config: &BuildConfig,
    transformer: &dyn StyleTransformer,
    bundler: &dyn ScriptBundler,
    scope: BuildScope,
) -> Result<PipelineReport, StageError> {
    match scope {
        BuildScope::Full => full_build(root, env, config, transformer, bundler),
        BuildScope::Stage(kind) => {
            let report = run_stage(root, env, config, transformer, bundler, kind)?;
            Ok(PipelineReport {
                stages: vec![report],
                sizes: None,
            })
        }
    }
}

fn full_build(
    root: &Path,
    env: &Environment,
    config: &BuildConfig,
    transformer: &dyn StyleTransformer,
    bundler: &dyn ScriptBundler,
) -> Result<PipelineReport, StageError> {
    let mut stages = Vec::new();

    stages.push(clean::run(root)?);

    // Styles, scripts, and copies touch disjoint regions of the staging
    // root; join all three before the dependent rewrite stages may start.
    let (styles_report, (scripts_report, copy_report)) = rayon::join(
        || styles::run(root, config, transformer),
        || {
            rayon::join(
                || scripts::run(root, config, bundler),
                || copy::run(root, config),
            )
        },
    );
    stages.push(styles_report?);
    stages.push(scripts_report?);
    stages.push(copy_report?);

    // Strictly sequential: revisioning must hash post-rewrite content.
    stages.push(cdn::run(root, env)?);
    stages.push(revision::run(root, env)?);
    stages.push(compress::run(root, env, config)?);

    let sizes = size::run(root)?;

    let report = PipelineReport {
        stages,
        sizes: Some(sizes),
    };
    if report.has_failures() {
        tracing::warn!("build finished with entry failures; see stage reports");
    }
    Ok(report)
}

fn run_stage(
    root: &Path,
    env: &Environment,
    config: &BuildConfig,
    transformer: &dyn StyleTransformer,
    bundler: &dyn ScriptBundler,
    kind: StageKind,
) -> Result<StageReport, StageError> {
    match kind {
        StageKind::Clean => clean::run(root),
        StageKind::Styles => styles::run(root, config, transformer),
        StageKind::Scripts => scripts::run(root, config, bundler),
        StageKind::Copy => copy::run(root, config),
        StageKind::CdnRewrite => cdn::run(root, env),
        StageKind::Revision => revision::run(root, env),
        StageKind::Compress => compress::run(root, env, config),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
