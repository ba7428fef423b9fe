//! Script-bundling stage.
//!
//! Every `.js` config entry goes through the injected [`ScriptBundler`]
//! strategy; output lands at `public/assets/bundles/<basename>` and, when the
//! strategy emits one, the source map at `public/assets/bundles/map.json`.
//! Entry-local failure policy as in the style stage.

use std::path::{Path, PathBuf};

use conveyor_bundler::ScriptBundler;
use conveyor_core::paths::{bundles_dir, source_map_path};
use conveyor_core::{AssetKind, BuildConfig};

use crate::error::{io_err, StageError};
use crate::report::{EntryOutcome, StageKind, StageReport};

/// Run the script stage for every configured bundle entry.
pub fn run(
    root: &Path,
    config: &BuildConfig,
    bundler: &dyn ScriptBundler,
) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(StageKind::Scripts);

    let mut script_entries: Vec<&PathBuf> = Vec::new();
    for entry in &config.bundles {
        if AssetKind::of(entry) == AssetKind::Script {
            script_entries.push(entry);
        } else {
            report.record(EntryOutcome::Skipped { entry: entry.clone() });
        }
    }

    if script_entries.is_empty() {
        return Ok(report);
    }

    let dest = bundles_dir(root);
    std::fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;

    for entry in script_entries {
        match bundle_one(root, entry, bundler, &dest) {
            Ok(output) => {
                tracing::info!("scripts: wrote {}", output.display());
                report.record(EntryOutcome::Written {
                    entry: entry.clone(),
                    output,
                });
            }
            Err(err) => {
                tracing::error!("scripts: {} failed: {err}", entry.display());
                report.record(EntryOutcome::Failed {
                    entry: entry.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn bundle_one(
    root: &Path,
    entry: &Path,
    bundler: &dyn ScriptBundler,
    dest: &Path,
) -> Result<PathBuf, StageError> {
    let entry_path = root.join(entry);
    let bundle = bundler.bundle(&entry_path)?;

    let file_name = entry_path
        .file_name()
        .ok_or_else(|| io_err(&entry_path, std::io::Error::other("entry has no file name")))?;
    let output = dest.join(file_name);
    std::fs::write(&output, &bundle.code).map_err(|e| io_err(&output, e))?;

    if let Some(map) = &bundle.source_map {
        let map_path = source_map_path(root);
        std::fs::write(&map_path, map).map_err(|e| io_err(&map_path, e))?;
    }

    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
