//! Staging-root traversal shared by the rewrite, revision, compression, and
//! size-report stages.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::StageError;

/// Every file under `dir`, sorted by path. Returns empty when the directory
/// does not exist (stages treat an absent staging root as "nothing staged").
pub fn files_under(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
