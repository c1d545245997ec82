//! In-process adapter backed by V8 via `deno_core`.
//!
//! Opt-in (`v8` cargo feature): building `deno_core` fetches a prebuilt V8
//! archive, which is too heavy for the default feature set.

use std::path::Path;
use std::time::{Duration, Instant};

use deno_core::{serde_v8, v8 as v8_sys, JsRuntime, RuntimeOptions};
use serde_json::{json, Value};
use tracing::debug;

use crate::engine::{log_first_run_preview, Engine};
use crate::payload::{merge_runtime_stats, normalize, Payload};
use crate::wrap::{bundle_companions, wrap_for_capture};
use crate::{BenchError, BenchResult};

/// Evaluates the wrapped script in one persistent [`JsRuntime`] and folds
/// isolate heap statistics into the payload's `runtime_stats`.
pub struct V8Engine {
    runtime: JsRuntime,
    wrapped: String,
    previewed: bool,
}

impl V8Engine {
    pub fn new(script_path: &Path, code: &str) -> BenchResult<Self> {
        let bundled = bundle_companions(script_path, code)?;
        Ok(V8Engine {
            runtime: JsRuntime::new(RuntimeOptions::default()),
            wrapped: wrap_for_capture(&bundled, false),
            previewed: false,
        })
    }

    fn heap_stats(&mut self) -> Value {
        let mut stats = v8_sys::HeapStatistics::default();
        self.runtime.v8_isolate().get_heap_statistics(&mut stats);
        json!({
            "used_heap_size": stats.used_heap_size(),
            "total_heap_size": stats.total_heap_size(),
            "external_memory": stats.external_memory(),
        })
    }
}

impl Engine for V8Engine {
    fn name(&self) -> &str {
        "v8"
    }

    fn execute(&mut self) -> BenchResult<(Duration, Payload)> {
        let start = Instant::now();
        let global = self
            .runtime
            .execute_script("bench.js", self.wrapped.clone())
            .map_err(|e| BenchError::engine("v8", e))?;
        let elapsed = start.elapsed();

        let value: Value = {
            let scope = &mut self.runtime.handle_scope();
            let local = v8_sys::Local::new(scope, global);
            serde_v8::from_v8(scope, local).map_err(|e| BenchError::engine("v8", e))?
        };
        let mut payload = normalize(value);
        merge_runtime_stats(&mut payload, self.heap_stats());

        if !self.previewed {
            self.previewed = true;
            log_first_run_preview(self.name(), &payload);
        }
        debug!(engine = self.name(), ms = elapsed.as_secs_f64() * 1000.0, "run complete");
        Ok((elapsed, payload))
    }
}
