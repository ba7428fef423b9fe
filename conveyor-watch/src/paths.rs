//! Watch bindings and runtime constants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use conveyor_core::paths::{scripts_source_dir, styles_source_dir};
use conveyor_core::BuildConfig;
use conveyor_stages::StageKind;

/// Events for the same path inside this window collapse into one rebuild.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// One watched directory and the stage its changes map to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub dir: PathBuf,
    pub stage: StageKind,
}

/// The three binding sets: style sources, script sources, and every
/// configured copy source.
pub fn watch_bindings(root: &Path, config: &BuildConfig) -> Vec<WatchBinding> {
    let mut bindings = vec![
        WatchBinding {
            dir: styles_source_dir(root),
            stage: StageKind::Styles,
        },
        WatchBinding {
            dir: scripts_source_dir(root),
            stage: StageKind::Scripts,
        },
    ];
    for pattern in config.copies.keys() {
        bindings.push(WatchBinding {
            dir: root.join(glob_base(pattern)),
            stage: StageKind::Copy,
        });
    }
    bindings
}

/// The static directory prefix of a glob pattern: components up to the first
/// one containing a wildcard.
fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(|c| matches!(c, '*' | '?' | '[')) {
            break;
        }
        base.push(component);
    }
    base
}
