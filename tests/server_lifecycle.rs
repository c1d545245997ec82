//! Server lifecycle behavior against fake interpreter binaries, so the
//! suite passes on hosts without node installed.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use js_bench::server::{materialize_default_server, NodeServer, ServerState};
use js_bench::BenchError;

fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[test]
fn test_child_exit_before_healthy_is_server_start_error() {
    let dir = tempfile::tempdir().unwrap();
    let fake_node = write_executable(
        dir.path(),
        "fake-node",
        "#!/bin/sh\necho \"bind failure on $PORT\" >&2\nexit 7\n",
    );

    let mut server = NodeServer::new(fake_node.to_str().unwrap(), Path::new("server.js"), 3901)
        .unwrap();
    let err = server.start().unwrap_err();
    match err {
        BenchError::ServerStart { exit, output } => {
            assert_eq!(exit, Some(7));
            assert!(output.contains("bind failure"));
        }
        other => panic!("expected ServerStart, got {other}"),
    }
    assert_eq!(server.state(), ServerState::Failed);

    // stop() after a failed start is a no-op, repeatedly.
    server.stop();
    server.stop();
}

#[test]
fn test_unresponsive_child_times_out_and_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let fake_node = write_executable(
        dir.path(),
        "fake-node",
        "#!/bin/sh\nsleep 600\n",
    );

    let mut server = NodeServer::new(fake_node.to_str().unwrap(), Path::new("server.js"), 3902)
        .unwrap();
    let err = server.start().unwrap_err();
    assert!(matches!(err, BenchError::ServerTimeout));
    assert_eq!(server.state(), ServerState::Failed);
}

#[test]
fn test_stop_before_start_is_safe() {
    let mut server = NodeServer::new("node", Path::new("server.js"), 3903).unwrap();
    server.stop();
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(!server.healthy());
}

#[test]
fn test_default_server_asset_matches_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = materialize_default_server(dir.path()).unwrap();
    let source = std::fs::read_to_string(path).unwrap();
    assert!(source.contains("GET") || source.contains("'/health'"));
    assert!(source.contains("'/run'"));
    assert!(source.contains("ok: false"));
}
