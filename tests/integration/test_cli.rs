#[path = "common.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn autogazelle() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("autogazelle");
    cmd.env_remove(common::WORKSPACE_ENV)
        .env_remove(common::BAZEL_REAL_ENV)
        .env_remove("RUST_LOG")
        .env_remove("GOPROXY")
        .env_remove("GOPRIVATE");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    autogazelle()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("--gazelle"));
}

#[test]
fn test_missing_gazelle_flag() {
    autogazelle()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("autogazelle: --gazelle not set"));
}

#[test]
fn test_fatal_error_is_logged_with_timestamp() {
    autogazelle()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_match(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap())
        .stderr(predicate::str::contains("ERROR"))
        .stderr(predicate::str::contains("autogazelle: --gazelle not set"));
}

#[test]
fn test_missing_gazelle_is_checked_before_environment() {
    let ws = common::workspace();
    autogazelle()
        .env(common::WORKSPACE_ENV, ws.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--gazelle not set"));
}

#[test]
fn test_missing_workspace_directory() {
    autogazelle()
        .args(["--gazelle", "//:gazelle"])
        .env(common::BAZEL_REAL_ENV, "/usr/bin/bazel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BUILD_WORKSPACE_DIRECTORY not set"));
}

#[test]
fn test_missing_bazel_real() {
    let ws = common::workspace();
    autogazelle()
        .args(["--gazelle", "//:gazelle"])
        .env(common::WORKSPACE_ENV, ws.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("BAZEL_REAL not set"));
}

#[test]
fn test_client_without_server_fails() {
    let ws = common::workspace();
    autogazelle()
        .args(["--gazelle", "//:gazelle"])
        .env(common::WORKSPACE_ENV, ws.path())
        .env(common::BAZEL_REAL_ENV, "/usr/bin/bazel")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to connect to autogazelle server"));

    // The client never starts a server of its own.
    assert!(!ws.path().join("tools/autogazelle.socket").exists());
}

#[test]
fn test_invalid_timeout_is_a_usage_error() {
    autogazelle()
        .args(["--gazelle", "//:gazelle", "--timeout", "whenever"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout"));
}

#[test]
fn test_restore_whole_workspace() {
    let ws = common::workspace();
    std::fs::write(ws.path().join("BUILD.bazel.in"), "# root\n").unwrap();
    std::fs::write(ws.path().join("pkg/BUILD.in"), "go_library(name = \"pkg\")\n").unwrap();

    autogazelle()
        .arg("restore")
        .current_dir(ws.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 2 build file(s)"));

    let restored = std::fs::read_to_string(ws.path().join("pkg/BUILD")).unwrap();
    assert_eq!(
        restored,
        "# This file was generated from BUILD.in\n# by autogazelle\n# DO NOT EDIT\n\ngo_library(name = \"pkg\")\n"
    );
    assert!(ws.path().join("BUILD.bazel").exists());
}

#[test]
fn test_restore_uses_workspace_environment() {
    let ws = common::workspace();
    std::fs::write(ws.path().join("pkg/BUILD.bazel.in"), "").unwrap();
    let elsewhere = tempfile::tempdir().unwrap();

    autogazelle()
        .arg("restore")
        .current_dir(elsewhere.path())
        .env(common::WORKSPACE_ENV, ws.path())
        .assert()
        .success();

    assert!(ws.path().join("pkg/BUILD.bazel").exists());
}

#[test]
fn test_restore_single_directory_without_templates() {
    let ws = common::workspace();
    autogazelle()
        .arg("restore")
        .arg(ws.path().join("pkg"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 0 build file(s)"));
}

#[test]
fn test_import_missing_lockfile() {
    let dir = tempfile::tempdir().unwrap();
    autogazelle()
        .arg("import")
        .arg(dir.path().join("Gopkg.lock"))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("failed to read"));
}
