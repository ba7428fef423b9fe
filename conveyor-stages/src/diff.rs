//! Dry-run unified diff support for `conveyor diff`.
//!
//! Recomputes style and script bundle outputs in memory and compares them to
//! the currently staged files. No files are written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use conveyor_bundler::{ScriptBundler, StyleTransformer};
use conveyor_core::paths::bundles_dir;
use conveyor_core::{AssetKind, BuildConfig};

use crate::error::{io_err, StageError};

/// A single bundle diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Compare what the bundling stages would produce against the staging root.
pub fn diff_bundles(
    root: &Path,
    config: &BuildConfig,
    transformer: &dyn StyleTransformer,
    bundler: &dyn ScriptBundler,
) -> Result<Vec<FileDiff>, StageError> {
    let dest = bundles_dir(root);
    let mut diffs = Vec::new();

    for entry in &config.bundles {
        let entry_path = root.join(entry);
        let fresh = match AssetKind::of(entry) {
            AssetKind::Style => {
                let source =
                    std::fs::read_to_string(&entry_path).map_err(|e| io_err(&entry_path, e))?;
                transformer.transform(&entry_path, &source)?
            }
            AssetKind::Script => bundler.bundle(&entry_path)?.code,
            AssetKind::Other => continue,
        };

        let file_name = entry_path
            .file_name()
            .ok_or_else(|| io_err(&entry_path, std::io::Error::other("entry has no file name")))?;
        let staged_path = dest.join(file_name);
        let staged = read_existing_or_empty(&staged_path)?;
        if staged == fresh {
            continue;
        }

        let rel = staged_path.strip_prefix(root).unwrap_or(staged_path.as_path());
        let old_header = format!("a/{}", rel.display());
        let new_header = format!("b/{}", rel.display());
        let unified = TextDiff::from_lines(&staged, &fresh)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(FileDiff {
            path: staged_path,
            unified_diff: unified,
        });
    }

    Ok(diffs)
}

fn read_existing_or_empty(path: &Path) -> Result<String, StageError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scripts, styles};
    use conveyor_bundler::{BundleError, ScriptBundle};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct Upper;
    impl StyleTransformer for Upper {
        fn transform(&self, _entry: &Path, source: &str) -> Result<String, BundleError> {
            Ok(source.to_uppercase())
        }
    }

    struct Wrap;
    impl ScriptBundler for Wrap {
        fn bundle(&self, entry: &Path) -> Result<ScriptBundle, BundleError> {
            let name = entry.file_name().unwrap().to_string_lossy();
            Ok(ScriptBundle {
                code: format!("bundled({name})"),
                source_map: None,
            })
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
    fn no_diffs_after_fresh_bundling() {
        let root = TempDir::new().unwrap();
        write_source(root.path(), "assets/styles/app.css", "body {}\n");
        write_source(root.path(), "assets/scripts/app.js", "code\n");
        let config = config(&["assets/styles/app.css", "assets/scripts/app.js"]);

        styles::run(root.path(), &config, &Upper).unwrap();
        scripts::run(root.path(), &config, &Wrap).unwrap();

        let diffs = diff_bundles(root.path(), &config, &Upper, &Wrap).unwrap();
        assert!(diffs.is_empty(), "freshly bundled tree should have no diff");
    }

    #[test]
    fn source_edit_produces_unified_diff() {
        let root = TempDir::new().unwrap();
        write_source(root.path(), "assets/styles/app.css", "body {}\n");
        let config = config(&["assets/styles/app.css"]);
        styles::run(root.path(), &config, &Upper).unwrap();

        write_source(root.path(), "assets/styles/app.css", "body {}\nh1 {}\n");

        let diffs = diff_bundles(root.path(), &config, &Upper, &Wrap).unwrap();
        assert_eq!(diffs.len(), 1);
        let unified = &diffs[0].unified_diff;
        assert!(unified.contains("--- a/public/assets/bundles/app.css"));
        assert!(unified.contains("+++ b/public/assets/bundles/app.css"));
        assert!(unified.contains("+H1 {}"));
    }

    #[test]
    fn unstaged_bundle_diffs_against_empty() {
        let root = TempDir::new().unwrap();
        write_source(root.path(), "assets/scripts/app.js", "code\n");

        let diffs =
            diff_bundles(root.path(), &config(&["assets/scripts/app.js"]), &Upper, &Wrap).unwrap();
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].unified_diff.contains("+bundled(app.js)"));
    }
}
