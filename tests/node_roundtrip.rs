//! End-to-end scenarios against a real node interpreter. Every test bails
//! out quietly when node is not installed on the host.

use std::path::Path;

use js_bench::engine::{probe_node, Engine};
use js_bench::engine::node_cli::NodeCli;
use js_bench::engine::node_http::NodeHttp;
use js_bench::harness::run_engine;
use js_bench::server::{materialize_default_server, NodeServer, ServerState};

fn node_available() -> bool {
    probe_node("node").is_some()
}

#[test]
fn test_node_cli_captures_result_and_logs() {
    if !node_available() {
        eprintln!("skipping: node not installed");
        return;
    }
    let mut engine = NodeCli::new(
        "node",
        Path::new("demos/inline.js"),
        "console.log('hi'); return 1 + 1;",
    )
    .unwrap();
    let (_, payload) = engine.execute().unwrap();
    assert_eq!(payload.result, serde_json::json!(2));
    assert_eq!(payload.rendered_logs(), vec!["hi".to_string()]);
}

#[test]
fn test_node_cli_reports_thrown_errors() {
    if !node_available() {
        eprintln!("skipping: node not installed");
        return;
    }
    let mut engine = NodeCli::new(
        "node",
        Path::new("demos/inline.js"),
        "throw new Error('kaboom');",
    )
    .unwrap();
    let err = engine.execute().unwrap_err();
    assert!(err.to_string().contains("kaboom"));
}

#[test]
fn test_server_roundtrip_through_http_adapter() {
    if !node_available() {
        eprintln!("skipping: node not installed");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let server_path = materialize_default_server(dir.path()).unwrap();
    let mut server = NodeServer::new("node", &server_path, 3921).unwrap();
    server.start().unwrap();
    assert_eq!(server.state(), ServerState::Healthy);
    assert!(server.healthy());

    let mut engine = NodeHttp::new(&server.base_url(), "console.log('srv'); return 40 + 2;")
        .unwrap();
    let outcome = run_engine(&mut engine, 3);
    server.stop();
    server.stop();

    assert!(outcome.ok(), "node-http failed: {:?}", outcome.error);
    assert_eq!(outcome.timings.len(), 3);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload.result, serde_json::json!(42));
    assert_eq!(payload.rendered_logs(), vec!["srv".to_string()]);
}

#[test]
fn test_server_reports_script_errors_without_dying() {
    if !node_available() {
        eprintln!("skipping: node not installed");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let server_path = materialize_default_server(dir.path()).unwrap();
    let mut server = NodeServer::new("node", &server_path, 3922).unwrap();
    server.start().unwrap();

    let mut failing = NodeHttp::new(&server.base_url(), "throw new Error('bad run');").unwrap();
    let err = failing.execute().unwrap_err();
    assert!(err.to_string().contains("bad run"));

    // The server survives a failed evaluation and keeps serving.
    let mut healthy = NodeHttp::new(&server.base_url(), "return 7;").unwrap();
    let (_, payload) = healthy.execute().unwrap();
    assert_eq!(payload.result, serde_json::json!(7));

    server.stop();
}
