//! Revision stage — content-hash renaming for cache busting.
//!
//! Production only. Every staged file (except the manifest and the source
//! map) is renamed to embed a 10-hex-char SHA-256 prefix of its content,
//! cross-references among staged text files are rewritten to the hashed
//! names, and the original → hashed mapping is written to the manifest.
//!
//! Digests are computed on pre-rewrite content: a file's own hash reflects
//! what the bundling/CDN stages produced, not the post-substitution text.
//! No unhashed original survives a successful run.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use conveyor_core::paths::{manifest_path, source_map_path, staging_root};
use conveyor_core::Environment;

use crate::error::{io_err, StageError};
use crate::manifest::{self, RevisionManifest};
use crate::report::{EntryOutcome, StageKind, StageReport};
use crate::walk::files_under;

/// Characters of the content digest embedded in revisioned names.
const DIGEST_LEN: usize = 10;

struct Rename {
    original: PathBuf,
    hashed: PathBuf,
    original_rel: String,
    hashed_rel: String,
}

/// Run the revision stage. No-op outside production.
pub fn run(root: &Path, env: &Environment) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(StageKind::Revision);
    if !env.mode.is_production() {
        return Ok(report);
    }

    let staging = staging_root(root);
    let files = files_under(&staging)?;
    if files.is_empty() {
        return Ok(report);
    }
    let excluded = [manifest_path(root), source_map_path(root)];

    // Plan every rename up front, on pre-rewrite content.
    let mut renames = Vec::new();
    let mut mapping = RevisionManifest::new();
    for file in &files {
        if excluded.contains(file) {
            report.record(EntryOutcome::Skipped { entry: file.clone() });
            continue;
        }
        let contents = std::fs::read(file).map_err(|e| io_err(file, e))?;
        let digest = content_digest(&contents);

        let hashed = file.with_file_name(revisioned_file_name(file, &digest));
        let original_rel = relative_string(file, &staging);
        let hashed_rel = relative_string(&hashed, &staging);
        mapping.insert(original_rel.clone(), hashed_rel.clone());
        renames.push(Rename {
            original: file.clone(),
            hashed,
            original_rel,
            hashed_rel,
        });
    }

    // Rename, with a human-readable summary per file.
    for rename in &renames {
        std::fs::rename(&rename.original, &rename.hashed)
            .map_err(|e| io_err(&rename.original, e))?;
        tracing::info!("revision: {} -> {}", rename.original_rel, rename.hashed_rel);
        report.record(EntryOutcome::Written {
            entry: rename.original.clone(),
            output: rename.hashed.clone(),
        });
    }

    // Rewrite cross-references in the renamed text files. Longest originals
    // first so no key can match inside a longer sibling's path.
    let mut pairs: Vec<(&str, &str)> = renames
        .iter()
        .map(|r| (r.original_rel.as_str(), r.hashed_rel.as_str()))
        .collect();
    pairs.sort_by_key(|(original, _)| std::cmp::Reverse(original.len()));

    for rename in &renames {
        let bytes = std::fs::read(&rename.hashed).map_err(|e| io_err(&rename.hashed, e))?;
        let Ok(text) = String::from_utf8(bytes) else {
            continue;
        };
        let mut rewritten = text.clone();
        for (original_rel, hashed_rel) in &pairs {
            rewritten = rewritten.replace(original_rel, hashed_rel);
        }
        if rewritten != text {
            std::fs::write(&rename.hashed, rewritten).map_err(|e| io_err(&rename.hashed, e))?;
        }
    }

    // Manifest write failures are stage-fatal.
    manifest::save_at(root, &mapping)?;
    Ok(report)
}

fn content_digest(contents: &[u8]) -> String {
    let mut digest = hex::encode(Sha256::digest(contents));
    digest.truncate(DIGEST_LEN);
    digest
}

/// `app.css` + `d41d8cd98f` → `app-d41d8cd98f.css`; extensionless files get
/// a bare suffix.
fn revisioned_file_name(path: &Path, digest: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{stem}-{digest}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{digest}"),
    }
}

fn relative_string(path: &Path, staging: &Path) -> String {
    path.strip_prefix(staging)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
