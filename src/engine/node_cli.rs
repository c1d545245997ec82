//! One-shot external interpreter adapter: a fresh `node` process per run.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::{log_first_run_preview, Engine};
use crate::payload::{normalize, Payload};
use crate::wrap::{bundle_companions, wrap_for_capture};
use crate::{BenchError, BenchResult};

/// Runs the wrapped script with `node -e` on every call. The wrapper echoes
/// its payload as the last stdout line, which is the only return channel a
/// one-shot process has.
pub struct NodeCli {
    node_path: String,
    wrapped: String,
    previewed: bool,
}

impl NodeCli {
    pub fn new(node_path: &str, script_path: &Path, code: &str) -> BenchResult<Self> {
        let bundled = bundle_companions(script_path, code)?;
        Ok(NodeCli {
            node_path: node_path.to_string(),
            wrapped: wrap_for_capture(&bundled, true),
            previewed: false,
        })
    }
}

impl Engine for NodeCli {
    fn name(&self) -> &str {
        "node-cli"
    }

    fn execute(&mut self) -> BenchResult<(Duration, Payload)> {
        let start = Instant::now();
        let output = Command::new(&self.node_path)
            .arg("-e")
            .arg(&self.wrapped)
            .output()
            .map_err(|e| BenchError::engine(self.name(), e))?;
        let elapsed = start.elapsed();

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BenchError::engine(
                self.name(),
                format!(
                    "exit {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                ),
            ));
        }
        if !stderr.trim().is_empty() {
            warn!(engine = self.name(), stderr = %stderr.trim(), "interpreter wrote to stderr");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = extract_payload(&stdout).ok_or_else(|| {
            BenchError::engine(self.name(), "no JSON payload line found in stdout")
        })?;

        if !self.previewed {
            self.previewed = true;
            log_first_run_preview(self.name(), &payload);
        }
        debug!(engine = self.name(), ms = elapsed.as_secs_f64() * 1000.0, "run complete");
        Ok((elapsed, payload))
    }
}

/// Scan stdout from the last line backward and normalize the first line
/// that is a syntactic JSON object. User scripts that print JSON-looking
/// lines after the wrapper's echo can shadow the payload; that ambiguity is
/// accepted.
fn extract_payload(stdout: &str) -> Option<Payload> {
    for line in stdout.lines().rev() {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            continue;
        }
        if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(trimmed) {
            return Some(normalize(value));
        }
    }
    None
}
