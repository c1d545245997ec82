//! Lifecycle management for the persistent node benchmark server.
//!
//! The server is an ordinary `node` child process speaking a two-endpoint
//! HTTP contract (`GET /health`, `POST /run`). Start/stop latency happens
//! entirely outside the timed benchmark iterations.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{BenchError, BenchResult};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(100);
const HEALTH_POLL_WINDOW: Duration = Duration::from_secs(5);
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Source for the default server, materialized when no script is supplied.
const NODE_SERVER_JS: &str = include_str!("node_server.js");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    Starting,
    Healthy,
    Failed,
    Stopped,
}

/// Handle to the node server child process.
///
/// `stop` is idempotent and safe to call at any point in the lifecycle,
/// including on handles that never started or whose start failed.
pub struct NodeServer {
    node_path: String,
    server_path: PathBuf,
    port: u16,
    state: ServerState,
    child: Option<Child>,
    client: reqwest::blocking::Client,
}

impl NodeServer {
    pub fn new(node_path: &str, server_path: &Path, port: u16) -> BenchResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HEALTH_PROBE_TIMEOUT)
            .build()
            .map_err(|e| BenchError::Message(format!("failed to build health client: {e}")))?;
        Ok(NodeServer {
            node_path: node_path.to_string(),
            server_path: server_path.to_path_buf(),
            port,
            state: ServerState::NotStarted,
            child: None,
            client,
        })
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Spawn the server and wait for it to answer the health probe.
    ///
    /// Polls every 100 ms within a 5 s window. A child that exits before
    /// becoming healthy fails with its captured output; an exhausted window
    /// times out. Both failure paths stop the handle before returning.
    pub fn start(&mut self) -> BenchResult<()> {
        self.state = ServerState::Starting;
        info!(server = %self.server_path.display(), port = self.port, "starting node server");

        let spawned = Command::new(&self.node_path)
            .arg(&self.server_path)
            .env("PORT", self.port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                self.state = ServerState::Failed;
                return Err(BenchError::Message(format!(
                    "failed to spawn node server: {e}"
                )));
            }
        };
        self.child = Some(child);

        let deadline = Instant::now() + HEALTH_POLL_WINDOW;
        while Instant::now() < deadline {
            if let Some(child) = self.child.as_mut() {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        let exit = status.code();
                        let output = self.drain_child_output();
                        self.state = ServerState::Failed;
                        self.stop();
                        return Err(BenchError::ServerStart { exit, output });
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("failed to poll server child: {e}");
                    }
                }
            }
            if self.healthy() {
                self.state = ServerState::Healthy;
                info!(url = %self.base_url(), "node server healthy");
                return Ok(());
            }
            std::thread::sleep(HEALTH_POLL_INTERVAL);
        }

        self.state = ServerState::Failed;
        self.stop();
        Err(BenchError::ServerTimeout)
    }

    /// Best-effort health probe; any network error counts as not ready.
    pub fn healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url());
        match self.client.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Terminate the child: graceful signal first, then a bounded wait,
    /// then a hard kill. Piped output is always drained. Calling this on a
    /// never-started or already-stopped handle does nothing.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            terminate_gracefully(&mut child);

            let deadline = Instant::now() + SHUTDOWN_GRACE;
            let mut exited = false;
            while Instant::now() < deadline {
                match child.try_wait() {
                    Ok(Some(_)) => {
                        exited = true;
                        break;
                    }
                    Ok(None) => std::thread::sleep(HEALTH_POLL_INTERVAL),
                    Err(_) => break,
                }
            }
            if !exited {
                if let Err(e) = child.kill() {
                    debug!("kill after grace period: {e}");
                }
            }

            match child.wait_with_output() {
                Ok(output) => {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !stdout.trim().is_empty() {
                        debug!(stdout = %stdout.trim(), "server stdout");
                    }
                    if !stderr.trim().is_empty() {
                        debug!(stderr = %stderr.trim(), "server stderr");
                    }
                }
                Err(e) => warn!("failed to drain server output: {e}"),
            }
            info!("node server stopped");
        }
        if self.state != ServerState::Failed {
            self.state = ServerState::Stopped;
        }
    }

    /// Collect the exited child's piped output for error reporting.
    fn drain_child_output(&mut self) -> String {
        let Some(child) = self.child.take() else {
            return String::new();
        };
        match child.wait_with_output() {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                format!("{}{}", stdout, stderr).trim().to_string()
            }
            Err(e) => format!("(failed to collect output: {e})"),
        }
    }
}

impl Drop for NodeServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn terminate_gracefully(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: signalling a pid we spawned and still own.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("kill on stop: {e}");
    }
}

/// Write the embedded default server script into `dir` and return its path.
pub fn materialize_default_server(dir: &Path) -> BenchResult<PathBuf> {
    let path = dir.join("node_server.js");
    std::fs::write(&path, NODE_SERVER_JS)
        .map_err(|e| BenchError::Message(format!("failed to write default server: {e}")))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_on_never_started_handle() {
        let mut server = NodeServer::new("node", Path::new("nope.js"), 3999).unwrap();
        assert_eq!(server.state(), ServerState::NotStarted);
        server.stop();
        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[test]
    fn test_health_probe_on_dead_port() {
        // Port 9 (discard) is closed on any sane test host.
        let server = NodeServer::new("node", Path::new("nope.js"), 9).unwrap();
        assert!(!server.healthy());
    }

    #[test]
    fn test_start_with_missing_interpreter_fails() {
        let mut server =
            NodeServer::new("/nonexistent/node", Path::new("nope.js"), 3998).unwrap();
        assert!(server.start().is_err());
        assert_eq!(server.state(), ServerState::Failed);
        server.stop();
    }

    #[test]
    fn test_materialize_default_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = materialize_default_server(dir.path()).unwrap();
        let source = std::fs::read_to_string(&path).unwrap();
        assert!(source.contains("/health"));
        assert!(source.contains("/run"));
        assert!(source.contains("process.env.PORT"));
    }
}
