#![cfg(unix)]

#[path = "common.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Full lifecycle: the server binds, runs gazelle over the whole workspace,
/// answers a client with a pass over the changed package, then shuts itself
/// down once idle and removes its socket.
#[test]
fn test_server_lifecycle() {
    let ws = common::workspace();
    let scratch = tempfile::tempdir().unwrap();
    let calls = scratch.path().join("calls.log");
    let bazel = common::fake_bazel(scratch.path(), &calls);
    let socket = ws.path().join("tools/autogazelle.socket");
    let log = ws.path().join("tools/autogazelle.log");

    let mut server = Command::new(assert_cmd::cargo::cargo_bin!("autogazelle"))
        .args(["--server", "--gazelle", "//:gazelle", "--timeout", "3s"])
        .env(common::WORKSPACE_ENV, ws.path())
        .env(common::BAZEL_REAL_ENV, &bazel)
        .env_remove("RUST_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn server");

    assert!(common::wait_for(Duration::from_secs(10), || socket.exists()), "socket never appeared");
    assert!(
        common::wait_for(Duration::from_secs(10), || !common::recorded_calls(&calls).is_empty()),
        "startup run never happened"
    );
    let startup = common::recorded_calls(&calls);
    assert_eq!(startup.len(), 1);
    assert_eq!(startup[0], "run //:gazelle -- -args -index=false");

    std::fs::write(ws.path().join("pkg/extra.go"), "package pkg\n").unwrap();
    std::thread::sleep(Duration::from_millis(500));

    cargo_bin_cmd!("autogazelle")
        .args(["--gazelle", "//:gazelle"])
        .env(common::WORKSPACE_ENV, ws.path())
        .env(common::BAZEL_REAL_ENV, &bazel)
        .assert()
        .success();

    let after = common::recorded_calls(&calls);
    assert_eq!(after.len(), 2, "calls: {after:?}");
    assert!(after[1].contains("-r=false"), "calls: {after:?}");
    assert!(after[1].ends_with("/pkg"), "calls: {after:?}");

    let exited = common::wait_for(Duration::from_secs(15), || {
        matches!(server.try_wait(), Ok(Some(_)))
    });
    if !exited {
        let _ = server.kill();
        panic!("server did not stop after its idle timeout");
    }
    assert!(server.wait().unwrap().success());
    assert!(!socket.exists());

    let log = std::fs::read_to_string(log).unwrap();
    assert!(log.contains("running gazelle"), "log: {log}");
}

/// A client with nothing changed gets an answer without gazelle running.
#[test]
fn test_client_with_nothing_dirty() {
    let ws = common::workspace();
    let scratch = tempfile::tempdir().unwrap();
    let calls = scratch.path().join("calls.log");
    let bazel = common::fake_bazel(scratch.path(), &calls);
    let socket = ws.path().join("tools/autogazelle.socket");

    let mut server = Command::new(assert_cmd::cargo::cargo_bin!("autogazelle"))
        .args(["--server", "--gazelle", "//:gazelle", "--timeout", "2s"])
        .env(common::WORKSPACE_ENV, ws.path())
        .env(common::BAZEL_REAL_ENV, &bazel)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn server");

    assert!(common::wait_for(Duration::from_secs(10), || socket.exists()));
    assert!(common::wait_for(Duration::from_secs(10), || common::recorded_calls(&calls).len() == 1));

    cargo_bin_cmd!("autogazelle")
        .args(["--gazelle", "//:gazelle"])
        .env(common::WORKSPACE_ENV, ws.path())
        .env(common::BAZEL_REAL_ENV, &bazel)
        .assert()
        .success();

    assert_eq!(common::recorded_calls(&calls).len(), 1);

    if !common::wait_for(Duration::from_secs(15), || matches!(server.try_wait(), Ok(Some(_)))) {
        let _ = server.kill();
        panic!("server did not stop after its idle timeout");
    }
}
