//! Size-report stage — pure observability over the staging root.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use conveyor_core::paths::staging_root;

use crate::error::{io_err, StageError};
use crate::walk::files_under;

/// One staged file and its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSize {
    /// Path relative to the staging root.
    pub path: PathBuf,
    pub bytes: u64,
}

/// Aggregate and per-file sizes, sorted by path.
#[derive(Debug, Clone, Serialize)]
pub struct SizeReport {
    pub generated_at: DateTime<Utc>,
    pub files: Vec<FileSize>,
    pub total_bytes: u64,
}

/// Measure everything under the staging root. No mutation.
pub fn run(root: &Path) -> Result<SizeReport, StageError> {
    let staging = staging_root(root);
    let mut files = Vec::new();
    let mut total_bytes = 0;

    for file in files_under(&staging)? {
        let bytes = std::fs::metadata(&file).map_err(|e| io_err(&file, e))?.len();
        total_bytes += bytes;
        files.push(FileSize {
            path: file.strip_prefix(&staging).unwrap_or(&file).to_path_buf(),
            bytes,
        });
    }

    Ok(SizeReport {
        generated_at: Utc::now(),
        files,
        total_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_staging_root_reports_zero() {
        let root = TempDir::new().unwrap();
        let report = run(root.path()).unwrap();
        assert!(report.files.is_empty());
        assert_eq!(report.total_bytes, 0);
    }

    #[test]
    fn totals_and_relative_paths() {
        let root = TempDir::new().unwrap();
        let staging = staging_root(root.path());
        std::fs::create_dir_all(staging.join("bundles")).unwrap();
        std::fs::write(staging.join("bundles/app.css"), b"12345").unwrap();
        std::fs::write(staging.join("index.html"), b"123").unwrap();

        let report = run(root.path()).unwrap();
        assert_eq!(report.total_bytes, 8);
        assert_eq!(report.files.len(), 2);
        let paths: Vec<_> = report.files.iter().map(|f| f.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["bundles/app.css", "index.html"]);
    }
}
