//! Revision manifest — original relative path → hash-suffixed relative path.
//!
//! A flat, sorted JSON map at `public/assets/manifest.json`, written with the
//! same atomic `.tmp` + rename pattern as the bundle cache. Downstream
//! template layers read it to emit correct asset URLs.

use std::collections::BTreeMap;
use std::path::Path;

use conveyor_core::paths::manifest_path;

use crate::error::{io_err, StageError};

/// Original relative path → revisioned relative path.
pub type RevisionManifest = BTreeMap<String, String>;

/// Write the manifest atomically. A failure here is stage-fatal.
pub fn save_at(root: &Path, manifest: &RevisionManifest) -> Result<(), StageError> {
    let path = manifest_path(root);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid manifest path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(manifest)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Load the manifest. Returns an empty map if none has been written.
pub fn load_at(root: &Path) -> Result<RevisionManifest, StageError> {
    let path = manifest_path(root);
    if !path.exists() {
        return Ok(RevisionManifest::new());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}
