//! Engine abstraction and the capability-probed registry.
//!
//! An engine is anything that can run the benchmark script once and hand
//! back a timed, normalized payload. External interpreters and in-process
//! runtimes sit behind the same trait; the registry only offers adapters
//! whose backing is actually present on this host and build.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::payload::Payload;
use crate::BenchResult;

pub mod mock;
pub mod node_cli;
pub mod node_http;

#[cfg(feature = "boa")]
pub mod boa;
#[cfg(feature = "quickjs")]
pub mod quickjs;
#[cfg(feature = "v8")]
pub mod v8;

/// One way of executing the benchmark script.
///
/// `execute` runs the script exactly once and reports the wall-clock
/// duration of that run together with the normalized payload. Adapters keep
/// whatever persistent state they need (a warm context, an HTTP client)
/// behind `&mut self`; the harness drives them strictly sequentially.
pub trait Engine {
    fn name(&self) -> &str;

    fn execute(&mut self) -> BenchResult<(Duration, Payload)>;
}

/// Check that an external interpreter binary exists and answers `--version`.
pub fn probe_node(node_path: &str) -> Option<String> {
    let output = Command::new(node_path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// Everything the registry needs to construct adapters for one script.
pub struct EngineSetup<'a> {
    pub script_path: &'a Path,
    pub code: &'a str,
    pub node_path: &'a str,
    pub server_url: Option<&'a str>,
}

/// Build every adapter available on this host, skipping the rest.
///
/// Skips are logged, never errors: a missing `node` binary drops both node
/// adapters, a feature compiled out drops its embedded adapter, and an
/// embedded runtime that fails to construct is reported and passed over.
pub fn register_engines(setup: &EngineSetup<'_>) -> BenchResult<Vec<Box<dyn Engine>>> {
    let mut engines: Vec<Box<dyn Engine>> = Vec::new();

    match probe_node(setup.node_path) {
        Some(version) => {
            debug!(node = %setup.node_path, %version, "node interpreter found");
            engines.push(Box::new(node_cli::NodeCli::new(
                setup.node_path,
                setup.script_path,
                setup.code,
            )?));
            if let Some(url) = setup.server_url {
                engines.push(Box::new(node_http::NodeHttp::new(url, setup.code)?));
            } else {
                info!("skipping node-http: server not running");
            }
        }
        None => {
            info!(node = %setup.node_path, "skipping node-cli and node-http: interpreter not found");
        }
    }

    #[cfg(feature = "boa")]
    match boa::BoaEngine::new(setup.script_path, setup.code) {
        Ok(engine) => engines.push(Box::new(engine)),
        Err(e) => warn!("skipping boa: {e}"),
    }

    #[cfg(feature = "quickjs")]
    match quickjs::QuickJsEngine::new(setup.script_path, setup.code) {
        Ok(engine) => engines.push(Box::new(engine)),
        Err(e) => warn!("skipping quickjs: {e}"),
    }

    #[cfg(feature = "v8")]
    match v8::V8Engine::new(setup.script_path, setup.code) {
        Ok(engine) => engines.push(Box::new(engine)),
        Err(e) => warn!("skipping v8: {e}"),
    }

    info!(
        engines = engines.len(),
        names = %engines.iter().map(|e| e.name()).collect::<Vec<_>>().join(", "),
        "registered engines"
    );
    Ok(engines)
}

/// Emit the one-time preview of a first successful run: the result and a
/// short log summary at info level. Adapters call this exactly once.
pub(crate) fn log_first_run_preview(engine: &str, payload: &Payload) {
    use crate::payload::{format_result, summarize_logs};
    info!(
        engine,
        result = %format_result(&payload.result),
        "first run result"
    );
    info!(engine, logs = %summarize_logs(&payload.logs), "captured output");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_missing_binary_is_none() {
        assert!(probe_node("/nonexistent/definitely-not-a-binary").is_none());
    }

    #[test]
    fn test_probe_failing_binary_is_none() {
        // `false` exits non-zero regardless of arguments.
        assert!(probe_node("false").is_none());
    }

    #[test]
    fn test_register_skips_unavailable_node() {
        let setup = EngineSetup {
            script_path: Path::new("demos/fibonacci.js"),
            code: "return 1;",
            node_path: "/nonexistent/node",
            server_url: None,
        };
        let engines = register_engines(&setup).unwrap();
        assert!(engines.iter().all(|e| !e.name().starts_with("node")));
    }
}
