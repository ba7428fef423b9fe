//! Project-relative path helpers.
//!
//! # Layout produced by a full build
//!
//! ```text
//! <root>/
//!   assets/
//!     config.yaml          (build configuration — input)
//!     styles/  scripts/    (bundle sources — input)
//!   public/assets/         (staging root — all pipeline output)
//!     bundles/             (compiled styles and scripts, map.json)
//!     images/              (copied + optimized images)
//!     manifest.json        (revision mapping, production only)
//!   tmp/
//!     bundle-cache.json    (incremental bundler cache)
//! ```
//!
//! Every helper is pure (`fn(root) -> PathBuf`, no I/O). Commands resolve
//! `root` from the current directory; tests pass a `TempDir`.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "assets/config.yaml";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SOURCE_MAP_FILE: &str = "map.json";
pub const BUNDLE_CACHE_FILE: &str = "bundle-cache.json";

/// `<root>/public/assets` — the staging root.
pub fn staging_root(root: &Path) -> PathBuf {
    root.join("public").join("assets")
}

/// `<root>/public/assets/bundles` — compiled style/script output.
pub fn bundles_dir(root: &Path) -> PathBuf {
    staging_root(root).join("bundles")
}

/// `<root>/public/assets/images` — optimizable image output.
pub fn images_dir(root: &Path) -> PathBuf {
    staging_root(root).join("images")
}

/// `<root>/public/assets/manifest.json` — revision manifest.
pub fn manifest_path(root: &Path) -> PathBuf {
    staging_root(root).join(MANIFEST_FILE)
}

/// `<root>/public/assets/bundles/map.json` — bundler source map.
pub fn source_map_path(root: &Path) -> PathBuf {
    bundles_dir(root).join(SOURCE_MAP_FILE)
}

/// `<root>/tmp/bundle-cache.json` — incremental bundler cache.
pub fn bundle_cache_path(root: &Path) -> PathBuf {
    root.join("tmp").join(BUNDLE_CACHE_FILE)
}

/// `<root>/assets/config.yaml` — build configuration.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<root>/assets/styles` — style sources watched in development.
pub fn styles_source_dir(root: &Path) -> PathBuf {
    root.join("assets").join("styles")
}

/// `<root>/assets/scripts` — script sources watched in development.
pub fn scripts_source_dir(root: &Path) -> PathBuf {
    root.join("assets").join("scripts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_paths_nest_under_root() {
        let root = Path::new("/work/site");
        assert_eq!(staging_root(root), Path::new("/work/site/public/assets"));
        assert_eq!(
            bundles_dir(root),
            Path::new("/work/site/public/assets/bundles")
        );
        assert_eq!(images_dir(root), Path::new("/work/site/public/assets/images"));
    }

    #[test]
    fn manifest_sits_at_staging_root() {
        let root = Path::new("/work/site");
        assert_eq!(
            manifest_path(root),
            Path::new("/work/site/public/assets/manifest.json")
        );
    }

    #[test]
    fn source_map_sits_in_bundles_dir() {
        let root = Path::new("/work/site");
        assert_eq!(
            source_map_path(root),
            Path::new("/work/site/public/assets/bundles/map.json")
        );
    }

    #[test]
    fn bundle_cache_sits_in_tmp() {
        let root = Path::new("/work/site");
        assert_eq!(
            bundle_cache_path(root),
            Path::new("/work/site/tmp/bundle-cache.json")
        );
    }
}
