//! Style-bundling stage.
//!
//! Every `.css` config entry is read, pushed through the injected
//! [`StyleTransformer`], and written to `public/assets/bundles/<basename>`.
//! A failure for one entry is logged and recorded; sibling entries and the
//! rest of the pipeline proceed (entry-local policy).

use std::path::{Path, PathBuf};

use conveyor_bundler::StyleTransformer;
use conveyor_core::paths::bundles_dir;
use conveyor_core::{AssetKind, BuildConfig};

use crate::error::{io_err, StageError};
use crate::report::{EntryOutcome, StageKind, StageReport};

/// Run the style stage for every configured bundle entry.
pub fn run(
    root: &Path,
    config: &BuildConfig,
    transformer: &dyn StyleTransformer,
) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(StageKind::Styles);

    let mut style_entries: Vec<&PathBuf> = Vec::new();
    for entry in &config.bundles {
        if AssetKind::of(entry) == AssetKind::Style {
            style_entries.push(entry);
        } else {
            report.record(EntryOutcome::Skipped { entry: entry.clone() });
        }
    }

    // No `.css` entries: complete without touching the transform machinery
    // or creating output directories.
    if style_entries.is_empty() {
        return Ok(report);
    }

    let dest = bundles_dir(root);
    std::fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;

    for entry in style_entries {
        match bundle_one(root, entry, transformer, &dest) {
            Ok(output) => {
                tracing::info!("styles: wrote {}", output.display());
                report.record(EntryOutcome::Written {
                    entry: entry.clone(),
                    output,
                });
            }
            Err(err) => {
                tracing::error!("styles: {} failed: {err}", entry.display());
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
    transformer: &dyn StyleTransformer,
    dest: &Path,
) -> Result<PathBuf, StageError> {
    let source_path = root.join(entry);
    let source = std::fs::read_to_string(&source_path).map_err(|e| io_err(&source_path, e))?;

    let css = transformer.transform(&source_path, &source)?;

    let file_name = source_path
        .file_name()
        .ok_or_else(|| io_err(&source_path, std::io::Error::other("entry has no file name")))?;
    let output = dest.join(file_name);
    std::fs::write(&output, css).map_err(|e| io_err(&output, e))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_bundler::BundleError;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Transformer fake: uppercases, or fails for entries whose source
    /// contains `fail`.
    struct Upper;

    impl StyleTransformer for Upper {
        fn transform(&self, _entry: &Path, source: &str) -> Result<String, BundleError> {
            if source.contains("fail") {
                return Err(BundleError::Protocol("bad css".to_string()));
            }
            Ok(source.to_uppercase())
        }
    }

    fn config(bundles: &[&str]) -> BuildConfig {
        BuildConfig {
            bundles: bundles.iter().map(PathBuf::from).collect(),
            copies: BTreeMap::new(),
            tools: Default::default(),
        }
    }

    fn write_source(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn writes_one_output_per_css_entry() {
        let root = TempDir::new().unwrap();
        write_source(root.path(), "assets/styles/app.css", "body {}");
        write_source(root.path(), "assets/styles/admin.css", "h1 {}");

        let report = run(
            root.path(),
            &config(&["assets/styles/app.css", "assets/styles/admin.css"]),
            &Upper,
        )
        .unwrap();

        assert_eq!(report.written(), 2);
        let out = bundles_dir(root.path());
        assert_eq!(std::fs::read_to_string(out.join("app.css")).unwrap(), "BODY {}");
        assert_eq!(std::fs::read_to_string(out.join("admin.css")).unwrap(), "H1 {}");
    }

    #[test]
    fn non_css_entries_are_skipped_not_failed() {
        let root = TempDir::new().unwrap();
        write_source(root.path(), "assets/styles/app.css", "body {}");

        let report = run(
            root.path(),
            &config(&["assets/styles/app.css", "assets/scripts/app.js"]),
            &Upper,
        )
        .unwrap();

        assert_eq!(report.written(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn no_css_entries_is_a_noop() {
        let root = TempDir::new().unwrap();
        let report = run(root.path(), &config(&["assets/scripts/app.js"]), &Upper).unwrap();
        assert_eq!(report.written(), 0);
        assert!(
            !bundles_dir(root.path()).exists(),
            "no-op must not create the bundles directory"
        );
    }

    #[test]
    fn failing_entry_does_not_abort_siblings() {
        let root = TempDir::new().unwrap();
        write_source(root.path(), "assets/styles/broken.css", "fail");
        write_source(root.path(), "assets/styles/app.css", "body {}");

        let report = run(
            root.path(),
            &config(&["assets/styles/broken.css", "assets/styles/app.css"]),
            &Upper,
        )
        .unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.written(), 1);
        assert!(bundles_dir(root.path()).join("app.css").exists());
        assert!(!bundles_dir(root.path()).join("broken.css").exists());
    }

    #[test]
    fn missing_source_is_entry_local() {
        let root = TempDir::new().unwrap();
        let report = run(root.path(), &config(&["assets/styles/ghost.css"]), &Upper).unwrap();
        assert_eq!(report.failed(), 1);
    }
}
