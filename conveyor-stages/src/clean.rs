//! Clean stage — remove the staging root and everything beneath it.

use std::path::Path;

use conveyor_core::paths::staging_root;

use crate::error::{io_err, StageError};
use crate::report::{EntryOutcome, StageKind, StageReport};

/// Recursively delete `<root>/public/assets`.
///
/// Succeeds when the staging root is already absent. Filesystem errors
/// (permissions, in-use handles) are stage-fatal; nothing is retried.
pub fn run(root: &Path) -> Result<StageReport, StageError> {
    let staging = staging_root(root);
    let mut report = StageReport::new(StageKind::Clean);

    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
        tracing::info!("cleaned {}", staging.display());
        report.record(EntryOutcome::Removed { path: staging });
    }

    Ok(report)
}
