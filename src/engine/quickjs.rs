//! In-process adapter backed by QuickJS via `rquickjs`.

use std::path::Path;
use std::time::{Duration, Instant};

use rquickjs::context::EvalOptions;
use rquickjs::{Context, Runtime};
use serde_json::{json, Value};
use tracing::debug;

use crate::engine::{log_first_run_preview, Engine};
use crate::payload::{merge_runtime_stats, normalize, Payload};
use crate::wrap::{bundle_companions, wrap_for_capture};
use crate::{BenchError, BenchResult};

/// Evaluates the wrapped script in one persistent runtime/context pair and
/// folds the runtime's memory counters into the payload's `runtime_stats`.
pub struct QuickJsEngine {
    runtime: Runtime,
    context: Context,
    wrapped: String,
    previewed: bool,
}

impl QuickJsEngine {
    pub fn new(script_path: &Path, code: &str) -> BenchResult<Self> {
        let bundled = bundle_companions(script_path, code)?;
        let runtime = Runtime::new().map_err(|e| BenchError::engine("quickjs", e))?;
        let context = Context::full(&runtime).map_err(|e| BenchError::engine("quickjs", e))?;
        Ok(QuickJsEngine {
            runtime,
            context,
            wrapped: wrap_for_capture(&bundled, false),
            previewed: false,
        })
    }

    fn memory_stats(&self) -> Value {
        let usage = self.runtime.memory_usage();
        json!({
            "malloc_count": usage.malloc_count,
            "malloc_size": usage.malloc_size,
            "memory_used_count": usage.memory_used_count,
            "memory_used_size": usage.memory_used_size,
        })
    }
}

impl Engine for QuickJsEngine {
    fn name(&self) -> &str {
        "quickjs"
    }

    fn execute(&mut self) -> BenchResult<(Duration, Payload)> {
        let start = Instant::now();
        let text = self.context.with(|ctx| -> BenchResult<String> {
            let mut options = EvalOptions::default();
            options.strict = false;
            ctx.eval_with_options::<String, _>(self.wrapped.as_bytes(), options).map_err(|e| {
                let reason = match e {
                    rquickjs::Error::Exception => {
                        let caught = ctx.catch();
                        format!("{caught:?}")
                    }
                    other => other.to_string(),
                };
                BenchError::engine("quickjs", reason)
            })
        })?;
        let elapsed = start.elapsed();

        let mut payload = normalize(Value::String(text));
        merge_runtime_stats(&mut payload, self.memory_stats());

        if !self.previewed {
            self.previewed = true;
            log_first_run_preview(self.name(), &payload);
        }
        debug!(engine = self.name(), ms = elapsed.as_secs_f64() * 1000.0, "run complete");
        Ok((elapsed, payload))
    }
}
