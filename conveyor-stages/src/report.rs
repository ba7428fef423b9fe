//! Stage reporting — per-entry outcomes instead of swallowed stream errors.
//!
//! A transform failure for one bundle entry is recorded here and the stage
//! carries on; the composer (or the CLI) decides whether any failures should
//! escalate. Only [`crate::error::StageError`] aborts a run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// StageKind
// ---------------------------------------------------------------------------

/// The named stages, in full-build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Clean,
    Styles,
    Scripts,
    Copy,
    CdnRewrite,
    Revision,
    Compress,
}

impl StageKind {
    /// All stages in pipeline order.
    pub fn all() -> &'static [StageKind] {
        &[
            StageKind::Clean,
            StageKind::Styles,
            StageKind::Scripts,
            StageKind::Copy,
            StageKind::CdnRewrite,
            StageKind::Revision,
            StageKind::Compress,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Clean => "clean",
            StageKind::Styles => "styles",
            StageKind::Scripts => "scripts",
            StageKind::Copy => "copy",
            StageKind::CdnRewrite => "cdn-rewrite",
            StageKind::Revision => "revision",
            StageKind::Compress => "compress",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// EntryOutcome
// ---------------------------------------------------------------------------

/// Outcome of one unit of stage work (a bundle entry, a copied file, a
/// rewritten or compressed asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "outcome")]
pub enum EntryOutcome {
    /// Output produced at `output`.
    Written { entry: PathBuf, output: PathBuf },
    /// Entry did not apply to this stage (wrong extension, binary content).
    Skipped { entry: PathBuf },
    /// A file or tree was deleted (clean stage, revision originals).
    Removed { path: PathBuf },
    /// Entry-local failure: logged, recorded, siblings proceed.
    Failed { entry: PathBuf, error: String },
}

// ---------------------------------------------------------------------------
// StageReport
// ---------------------------------------------------------------------------

/// Aggregated outcomes for a single stage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub outcomes: Vec<EntryOutcome>,
}

impl StageReport {
    pub fn new(stage: StageKind) -> Self {
        StageReport {
            stage,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: EntryOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Written { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Skipped { .. }))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

// ---------------------------------------------------------------------------
// PipelineReport
// ---------------------------------------------------------------------------

/// Report for a whole composed run. `sizes` is present only when the run
/// ended with the size-report stage (full builds).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<crate::size::SizeReport>,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(StageReport::has_failures)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
