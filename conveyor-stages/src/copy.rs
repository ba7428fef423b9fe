//! Copy stage — verbatim copies from source globs to destination directories.

use std::path::Path;

use conveyor_core::BuildConfig;

use crate::error::{io_err, StageError};
use crate::report::{EntryOutcome, StageKind, StageReport};

/// Copy every file matching each configured `(source glob, destination)`
/// pair. No transform. Filesystem errors are stage-fatal.
pub fn run(root: &Path, config: &BuildConfig) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(StageKind::Copy);

    for (pattern, dest) in &config.copies {
        let dest_dir = root.join(dest);
        let absolute_pattern = root.join(pattern);
        let matches = glob::glob(&absolute_pattern.to_string_lossy())?;

        let mut matched_any = false;
        for matched in matches {
            let source = matched?;
            if !source.is_file() {
                continue;
            }
            if !matched_any {
                std::fs::create_dir_all(&dest_dir).map_err(|e| io_err(&dest_dir, e))?;
                matched_any = true;
            }

            let file_name = source
                .file_name()
                .ok_or_else(|| io_err(&source, std::io::Error::other("match has no file name")))?;
            let target = dest_dir.join(file_name);
            std::fs::copy(&source, &target).map_err(|e| io_err(&target, e))?;
            tracing::debug!("copy: {} -> {}", source.display(), target.display());
            report.record(EntryOutcome::Written {
                entry: source,
                output: target,
            });
        }
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
