//! Compression stage — gzip siblings for text assets, external optimizers
//! for images.
//!
//! Production only. The two halves run concurrently and fail independently:
//! a missing optimizer binary costs those image entries (recorded per file),
//! never the gzip output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use conveyor_bundler::Tool;
use conveyor_core::paths::{images_dir, staging_root};
use conveyor_core::types::{is_compressible, ImageKind};
use conveyor_core::{BuildConfig, Environment};

use crate::error::{io_err, StageError};
use crate::report::{EntryOutcome, StageKind, StageReport};
use crate::walk::files_under;

/// Maximum gzip level.
const GZIP_LEVEL: u32 = 9;

/// Run the compression stage. No-op outside production.
pub fn run(root: &Path, env: &Environment, config: &BuildConfig) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(StageKind::Compress);
    if !env.mode.is_production() {
        return Ok(report);
    }

    let (gzip_outcomes, image_outcomes) =
        rayon::join(|| gzip_assets(root), || optimize_images(root, config));

    // Independent failure domains: surface whichever half failed fatally,
    // but only after both have finished.
    report.outcomes.extend(gzip_outcomes?);
    report.outcomes.extend(image_outcomes?);
    Ok(report)
}

/// Write a `.gz` sibling for every compressible staged asset.
fn gzip_assets(root: &Path) -> Result<Vec<EntryOutcome>, StageError> {
    let mut outcomes = Vec::new();
    for file in files_under(&staging_root(root))? {
        if !is_compressible(&file) {
            continue;
        }
        let contents = std::fs::read(&file).map_err(|e| io_err(&file, e))?;

        let mut target = file.as_os_str().to_owned();
        target.push(".gz");
        let target = std::path::PathBuf::from(target);

        let out = File::create(&target).map_err(|e| io_err(&target, e))?;
        let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::new(GZIP_LEVEL));
        encoder.write_all(&contents).map_err(|e| io_err(&target, e))?;
        encoder.finish().map_err(|e| io_err(&target, e))?;

        tracing::debug!("compress: wrote {}", target.display());
        outcomes.push(EntryOutcome::Written {
            entry: file,
            output: target,
        });
    }
    Ok(outcomes)
}

/// Run the configured optimizers over everything under `images/`.
/// Per-file failures (missing binary, corrupt image) are entry-local.
fn optimize_images(root: &Path, config: &BuildConfig) -> Result<Vec<EntryOutcome>, StageError> {
    let mut outcomes = Vec::new();
    let images = images_dir(root);
    if !images.exists() {
        return Ok(outcomes);
    }

    let png = Tool::from_command(&config.tools.png_optimizer);
    let jpeg = Tool::from_command(&config.tools.jpeg_optimizer);

    for file in files_under(&images)? {
        let tool = match ImageKind::of(&file) {
            Some(ImageKind::Png) => &png,
            Some(ImageKind::Jpeg) => &jpeg,
            None => {
                outcomes.push(EntryOutcome::Skipped { entry: file });
                continue;
            }
        };
        match tool.run_on_file(&file) {
            Ok(()) => outcomes.push(EntryOutcome::Written {
                entry: file.clone(),
                output: file,
            }),
            Err(err) => {
                tracing::warn!("compress: optimizing {} failed: {err}", file.display());
                outcomes.push(EntryOutcome::Failed {
                    entry: file,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(outcomes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::Mode;
    use std::collections::BTreeMap;
    use std::io::Read;
    use tempfile::TempDir;

    fn stage_file(root: &Path, rel: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = staging_root(root).join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn sh_config(png: &str, jpeg: &str) -> BuildConfig {
        let sh = |script: &str| vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let mut tools = conveyor_core::ToolConfig::default();
        tools.png_optimizer = sh(png);
        tools.jpeg_optimizer = sh(jpeg);
        BuildConfig {
            bundles: vec![],
            copies: BTreeMap::new(),
            tools,
        }
    }

    fn missing_optimizers() -> BuildConfig {
        let mut tools = conveyor_core::ToolConfig::default();
        tools.png_optimizer = vec!["conveyor-no-such-optimizer".to_string()];
        tools.jpeg_optimizer = vec!["conveyor-no-such-optimizer".to_string()];
        BuildConfig {
            bundles: vec![],
            copies: BTreeMap::new(),
            tools,
        }
    }

    #[test]
    fn noop_in_development() {
        let root = TempDir::new().unwrap();
        stage_file(root.path(), "bundles/app.css", b"body{}");
        let report = run(
            root.path(),
            &Environment::for_mode(Mode::Development),
            &missing_optimizers(),
        )
        .unwrap();
        assert!(report.outcomes.is_empty());
        assert!(!staging_root(root.path()).join("bundles/app.css.gz").exists());
    }

    #[test]
    fn gzips_text_like_assets_only() {
        let root = TempDir::new().unwrap();
        stage_file(root.path(), "bundles/app.css", b"body { color: #fff }");
        stage_file(root.path(), "index.html", b"<html></html>");
        stage_file(root.path(), "images/logo.gif", b"GIF89a");

        let report = run(
            root.path(),
            &Environment::for_mode(Mode::Production),
            &missing_optimizers(),
        )
        .unwrap();

        let staging = staging_root(root.path());
        assert!(staging.join("bundles/app.css.gz").exists());
        assert!(staging.join("index.html.gz").exists());
        assert!(!staging.join("images/logo.gif.gz").exists());
        assert!(report.written() >= 2);
    }

    #[test]
    fn gzip_round_trips_original_bytes() {
        let root = TempDir::new().unwrap();
        let payload = b"body { color: red } ".repeat(64);
        stage_file(root.path(), "bundles/app.css", &payload);

        run(
            root.path(),
            &Environment::for_mode(Mode::Production),
            &missing_optimizers(),
        )
        .unwrap();

        let gz = staging_root(root.path()).join("bundles/app.css.gz");
        let mut decoder = flate2::read::GzDecoder::new(File::open(gz).unwrap());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, payload);
    }

    #[test]
    #[cfg(unix)]
    fn images_dispatch_to_kind_specific_optimizer() {
        let root = TempDir::new().unwrap();
        stage_file(root.path(), "images/logo.png", b"png");
        stage_file(root.path(), "images/photo.jpg", b"jpg");

        let report = run(
            root.path(),
            &Environment::for_mode(Mode::Production),
            &sh_config("printf png-opt > \"$0\"", "printf jpeg-opt > \"$0\""),
        )
        .unwrap();

        let images = images_dir(root.path());
        assert_eq!(std::fs::read(images.join("logo.png")).unwrap(), b"png-opt");
        assert_eq!(std::fs::read(images.join("photo.jpg")).unwrap(), b"jpeg-opt");
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn missing_optimizer_does_not_cost_the_gzip_half() {
        let root = TempDir::new().unwrap();
        stage_file(root.path(), "bundles/app.js", b"code");
        stage_file(root.path(), "images/logo.png", b"png");

        let report = run(
            root.path(),
            &Environment::for_mode(Mode::Production),
            &missing_optimizers(),
        )
        .unwrap();

        assert!(staging_root(root.path()).join("bundles/app.js.gz").exists());
        assert_eq!(report.failed(), 1, "png entry records the optimizer failure");
    }
}
