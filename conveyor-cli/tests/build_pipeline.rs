//! CLI integration tests — full builds and per-stage commands against a
//! fixture project with shell-backed tools.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const CONFIG: &str = r#"bundles:
  - assets/styles/app.css
  - assets/scripts/app.js
copies:
  "assets/images/*": public/assets/images
tools:
  style_passes:
    - ["cat"]
  style_minifier: ["tr", "-d", " "]
  bundle_command:
    - sh
    - -c
    - if [ "$1" = --minify ]; then tr -d ' ' < "$0"; printf '{}' > "$3"; else cat "$0"; fi
  png_optimizer: ["true"]
  jpeg_optimizer: ["true"]
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let root = tempfile::TempDir::new().unwrap();
    write(root.path(), "assets/config.yaml", CONFIG);
    write(root.path(), "assets/styles/app.css", "body { color: red }\n");
    write(root.path(), "assets/scripts/app.js", "var a = 1 ;\n");
    write(root.path(), "assets/images/logo.png", "fake png");
    root
}

fn conveyor(root: &Path, mode: &str) -> Command {
    let mut cmd = Command::cargo_bin("conveyor").expect("binary");
    cmd.current_dir(root)
        .env("NODE_ENV", mode)
        .env_remove("ASSET_HOST")
        .env_remove("PORT");
    cmd
}

fn staging(root: &Path) -> std::path::PathBuf {
    root.join("public").join("assets")
}

#[test]
fn build_without_config_fails() {
    let root = tempfile::TempDir::new().unwrap();
    conveyor(root.path(), "development")
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
#[cfg(unix)]
fn development_build_stages_unminified_bundles() {
    let root = fixture();
    conveyor(root.path(), "development")
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: development"));

    let staged = staging(root.path());
    assert_eq!(
        std::fs::read_to_string(staged.join("bundles/app.css")).unwrap(),
        "body { color: red }\n"
    );
    assert_eq!(
        std::fs::read_to_string(staged.join("bundles/app.js")).unwrap(),
        "var a = 1 ;\n"
    );
    assert!(staged.join("images/logo.png").exists());
    assert!(!staged.join("manifest.json").exists());
}

#[test]
#[cfg(unix)]
fn production_build_revisions_and_compresses() {
    let root = fixture();
    conveyor(root.path(), "production")
        .arg("build")
        .assert()
        .success();

    let staged = staging(root.path());
    assert!(staged.join("manifest.json").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(staged.join("manifest.json")).unwrap())
            .unwrap();
    let css_rel = manifest["bundles/app.css"].as_str().expect("css entry");
    assert!(css_rel.ends_with(".css"));
    assert_eq!(
        std::fs::read_to_string(staged.join(css_rel)).unwrap(),
        "body{color:red}\n"
    );
    assert!(staged.join(format!("{css_rel}.gz")).exists());
    assert!(
        !staged.join("bundles/app.css").exists(),
        "unhashed original must be gone"
    );
}

#[test]
#[cfg(unix)]
fn build_json_emits_pipeline_report() {
    let root = fixture();
    conveyor(root.path(), "development")
        .args(["build", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stages\""))
        .stdout(predicate::str::contains("\"total_bytes\""));
}

#[test]
#[cfg(unix)]
fn clean_removes_staging_root() {
    let root = fixture();
    conveyor(root.path(), "development").arg("build").assert().success();
    assert!(staging(root.path()).exists());

    conveyor(root.path(), "development").arg("clean").assert().success();
    assert!(!staging(root.path()).exists());
}

#[test]
#[cfg(unix)]
fn styles_stage_leaves_scripts_unbundled() {
    let root = fixture();
    conveyor(root.path(), "development")
        .arg("styles")
        .assert()
        .success()
        .stdout(predicate::str::contains("styles"));

    let staged = staging(root.path());
    assert!(staged.join("bundles/app.css").exists());
    assert!(!staged.join("bundles/app.js").exists());
}

#[test]
#[cfg(unix)]
fn copy_stage_copies_byte_identical() {
    let root = fixture();
    conveyor(root.path(), "development").arg("copy").assert().success();
    assert_eq!(
        std::fs::read(staging(root.path()).join("images/logo.png")).unwrap(),
        b"fake png"
    );
}

#[test]
#[cfg(unix)]
fn size_json_reports_totals() {
    let root = fixture();
    conveyor(root.path(), "development").arg("build").assert().success();
    conveyor(root.path(), "development")
        .args(["size", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total_bytes"));
}

#[test]
#[cfg(unix)]
fn diff_is_quiet_after_fresh_build_and_loud_after_edit() {
    let root = fixture();
    conveyor(root.path(), "development").arg("build").assert().success();
    conveyor(root.path(), "development")
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    write(root.path(), "assets/styles/app.css", "body { color: blue }\n");
    conveyor(root.path(), "development")
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("would change"));
}

#[test]
fn watch_status_reports_not_running() {
    let root = fixture();
    let mut cmd = Command::cargo_bin("conveyor").expect("binary");
    cmd.current_dir(root.path())
        .env("NODE_ENV", "development")
        .env("PORT", "1")
        .args(["watch", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}
