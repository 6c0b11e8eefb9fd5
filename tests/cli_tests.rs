//! Command line behaviour of the `kodegen_bundler_appimage` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("kodegen_bundler_appimage").unwrap()
}

fn project(root: &std::path::Path) {
    std::fs::create_dir_all(root.join("app")).unwrap();
    std::fs::write(root.join("app/mock-app"), "#!/bin/sh\necho 'Hello world!'\n").unwrap();
    std::fs::write(
        root.join("package.json"),
        r#"{"name": "mock-app", "productName": "Mock App", "version": "1.0.0"}"#,
    )
    .unwrap();
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("AppImage"))
        .stdout(predicate::str::contains("--make-dir"));
}

#[test]
fn test_missing_app_dir() {
    let tmp = tempfile::TempDir::new().unwrap();
    cmd()
        .current_dir(tmp.path())
        .args(["--dir", "nowhere"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Application directory not found"));
}

#[test]
fn test_unsupported_arch() {
    let tmp = tempfile::TempDir::new().unwrap();
    project(tmp.path());
    cmd()
        .current_dir(tmp.path())
        .args(["--dir", "app", "--arch", "wrong-arch"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported architecture: 'wrong-arch'."));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_unsupported_options_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    project(tmp.path());
    std::fs::write(tmp.path().join("appimage.yaml"), "name: x\n").unwrap();
    cmd()
        .current_dir(tmp.path())
        .args(["--dir", "app", "--config", "appimage.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected .json or .toml"));
}
