//! Bundle cache — digest-gated reuse of external bundler output.
//!
//! Persists a `BundleCacheFile` JSON document at `<root>/tmp/bundle-cache.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the revision manifest.
//!
//! The incremental bundler strategy consults this cache before launching the
//! external bundler: if the digest of an entry's source tree is unchanged, the
//! previous output is returned without spawning anything. That is what keeps
//! watch-loop rebuilds interactive.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, BundleError};

/// One cached bundler invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedBundle {
    /// Digest of the entry's source tree (plus mode) at bundle time.
    pub digest: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
}

/// On-disk bundle cache payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleCacheFile {
    pub updated_at: DateTime<Utc>,
    /// Entry path string → cached output.
    pub entries: BTreeMap<String, CachedBundle>,
}

impl BundleCacheFile {
    pub fn empty() -> Self {
        BundleCacheFile {
            updated_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }
}

/// Load the bundle cache. Returns an empty cache if the file does not yet
/// exist; a corrupt cache file is discarded rather than failing the build.
pub fn load(path: &Path) -> Result<BundleCacheFile, BundleError> {
    if !path.exists() {
        return Ok(BundleCacheFile::empty());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    match serde_json::from_str(&contents) {
        Ok(cache) => Ok(cache),
        Err(err) => {
            log::warn!("discarding corrupt bundle cache at {}: {err}", path.display());
            Ok(BundleCacheFile::empty())
        }
    }
}

/// Save the bundle cache atomically (`.tmp` sibling, then rename).
pub fn save(path: &Path, cache: &BundleCacheFile) -> Result<(), BundleError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid bundle cache path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(cache)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
