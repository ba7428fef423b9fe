//! Asset classification.
//!
//! Stages branch on what a file *is* — a style entry, a script entry, a
//! compressible text asset, an optimizable image — never on ad-hoc extension
//! string checks scattered through stage code.

use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

/// Classification of a configured bundle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// `.css` — handled by the style stage.
    Style,
    /// `.js` — handled by the script stage.
    Script,
    /// Anything else — skipped by both bundling stages.
    Other,
}

impl AssetKind {
    /// Classify by file extension (case-insensitive).
    pub fn of(path: &Path) -> AssetKind {
        match extension_lowercase(path).as_deref() {
            Some("css") => AssetKind::Style,
            Some("js") => AssetKind::Script,
            _ => AssetKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Extension predicates
// ---------------------------------------------------------------------------

/// Extensions the compression stage gzips.
const COMPRESSIBLE: &[&str] = &["html", "css", "js", "txt", "md"];

/// True for text-like assets that get a sibling `.gz` in production.
pub fn is_compressible(path: &Path) -> bool {
    matches!(extension_lowercase(path).as_deref(), Some(ext) if COMPRESSIBLE.contains(&ext))
}

/// Image kind for the optimization half of the compression stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn of(path: &Path) -> Option<ImageKind> {
        match extension_lowercase(path).as_deref() {
            Some("png") => Some(ImageKind::Png),
            Some("jpg") | Some("jpeg") => Some(ImageKind::Jpeg),
            _ => None,
        }
    }
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
