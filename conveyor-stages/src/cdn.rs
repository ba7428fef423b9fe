//! CDN rewrite stage — point staged `/assets/...` references at the
//! configured asset host.
//!
//! Runs only in production with an asset host set; must run after the
//! bundling/copy group (it rewrites their combined output) and before
//! revisioning (hashes must cover the rewritten content).

use std::borrow::Cow;
use std::path::Path;

use regex::Regex;

use conveyor_core::paths::staging_root;
use conveyor_core::Environment;

use crate::error::{io_err, StageError};
use crate::report::{EntryOutcome, StageKind, StageReport};
use crate::walk::files_under;

/// Reference shapes eligible for rewriting, mirroring the asset extensions
/// a page can address directly.
const REFERENCE_PATTERN: &str =
    r"(?i)/assets/((?:\w|/|-)*\.(?:css|js|jpg|jpeg|png|gif|swf))";

/// Rewrite every staged text file. No-op success outside production or
/// without an asset host.
pub fn run(root: &Path, env: &Environment) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(StageKind::CdnRewrite);

    if !env.mode.is_production() {
        return Ok(report);
    }
    let Some(host) = env.asset_host.as_deref() else {
        return Ok(report);
    };

    let pattern = Regex::new(REFERENCE_PATTERN)?;
    for file in files_under(&staging_root(root))? {
        let bytes = std::fs::read(&file).map_err(|e| io_err(&file, e))?;

        // Binary content is skipped, never rewritten.
        let Ok(text) = String::from_utf8(bytes) else {
            report.record(EntryOutcome::Skipped { entry: file });
            continue;
        };

        let rewritten = pattern.replace_all(&text, |caps: &regex::Captures<'_>| {
            format!("{host}/assets/{}", &caps[1])
        });

        if let Cow::Owned(changed) = rewritten {
            std::fs::write(&file, changed).map_err(|e| io_err(&file, e))?;
            tracing::info!("cdn: rewrote {}", file.display());
            report.record(EntryOutcome::Written {
                entry: file.clone(),
                output: file,
            });
        }
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::Mode;
    use tempfile::TempDir;

    const HOST: &str = "https://cdn.example.com";

    fn stage_file(root: &Path, rel: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = staging_root(root).join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn rewrites_asset_references_to_host() {
        let root = TempDir::new().unwrap();
        let file = stage_file(
            root.path(),
            "bundles/app.css",
            b"url(/assets/images/bg.png); src: \"/assets/bundles/app.js\"",
        );

        run(root.path(), &Environment::with_asset_host(Mode::Production, HOST)).unwrap();

        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains("https://cdn.example.com/assets/images/bg.png"));
        assert!(text.contains("https://cdn.example.com/assets/bundles/app.js"));
        assert!(!text.contains("(/assets/"), "bare form must be gone: {text}");
    }

    #[test]
    fn skips_binary_files() {
        let root = TempDir::new().unwrap();
        let payload = b"\x00\x01/assets/app.js\xff\xfe";
        let file = stage_file(root.path(), "images/raw.png", payload);

        let report = run(
            root.path(),
            &Environment::with_asset_host(Mode::Production, HOST),
        )
        .unwrap();

        assert_eq!(std::fs::read(file).unwrap(), payload);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn noop_in_development() {
        let root = TempDir::new().unwrap();
        let file = stage_file(root.path(), "index.html", b"<script src=\"/assets/app.js\">");

        let report = run(
            root.path(),
            &Environment::with_asset_host(Mode::Development, HOST),
        )
        .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(std::fs::read_to_string(file).unwrap().contains("\"/assets/app.js\""));
    }

    #[test]
    fn noop_without_asset_host() {
        let root = TempDir::new().unwrap();
        stage_file(root.path(), "index.html", b"<script src=\"/assets/app.js\">");
        let report = run(root.path(), &Environment::for_mode(Mode::Production)).unwrap();
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn non_asset_extensions_are_untouched() {
        let root = TempDir::new().unwrap();
        let file = stage_file(root.path(), "notes.txt", b"see /assets/readme.pdf and /assets/x.woff");

        run(root.path(), &Environment::with_asset_host(Mode::Production, HOST)).unwrap();

        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains("/assets/readme.pdf"));
        assert!(!text.contains(HOST));
    }

    #[test]
    fn rewrite_is_case_insensitive_on_extension() {
        let root = TempDir::new().unwrap();
        let file = stage_file(root.path(), "index.html", b"<img src=\"/assets/logo.PNG\">");

        run(root.path(), &Environment::with_asset_host(Mode::Production, HOST)).unwrap();

        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains("https://cdn.example.com/assets/logo.PNG"));
    }
}
