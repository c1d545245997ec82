//! Server-client adapter: the persistent node HTTP service runs the script.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::engine::{log_first_run_preview, Engine};
use crate::payload::{normalize, Payload};
use crate::wrap::wrap_for_capture;
use crate::{BenchError, BenchResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the wrapped script to an already-running server's `/run` endpoint.
/// The server evaluates the code and returns the payload in the response
/// body, so the wrapper is built without stdout echo. Companion bundling is
/// not applied here; the server resolves modules itself.
pub struct NodeHttp {
    run_url: String,
    wrapped: String,
    client: reqwest::blocking::Client,
    previewed: bool,
}

impl NodeHttp {
    pub fn new(base_url: &str, code: &str) -> BenchResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BenchError::engine("node-http", e))?;
        Ok(NodeHttp {
            run_url: format!("{}/run", base_url.trim_end_matches('/')),
            wrapped: wrap_for_capture(code, false),
            client,
            previewed: false,
        })
    }
}

impl Engine for NodeHttp {
    fn name(&self) -> &str {
        "node-http"
    }

    fn execute(&mut self) -> BenchResult<(Duration, Payload)> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.run_url)
            .json(&serde_json::json!({ "code": self.wrapped }))
            .send()
            .map_err(|e| BenchError::engine(self.name(), e))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| BenchError::engine(self.name(), format!("bad response body: {e}")))?;
        let elapsed = start.elapsed();

        let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !ok {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("server returned status {status}"));
            return Err(BenchError::engine(self.name(), reason));
        }

        let payload = normalize(body.get("result").cloned().unwrap_or(Value::Null));

        if !self.previewed {
            self.previewed = true;
            log_first_run_preview(self.name(), &payload);
        }
        debug!(engine = self.name(), ms = elapsed.as_secs_f64() * 1000.0, "run complete");
        Ok((elapsed, payload))
    }
}
