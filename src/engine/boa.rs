//! In-process adapter backed by the pure-Rust Boa engine.

use std::path::Path;
use std::time::{Duration, Instant};

use boa_engine::{Context, Source};
use tracing::debug;

use crate::engine::{log_first_run_preview, Engine};
use crate::payload::{normalize, Payload};
use crate::wrap::{bundle_companions, wrap_for_capture};
use crate::{BenchError, BenchResult};

/// Evaluates the wrapped script in one persistent [`Context`]; the context
/// stays warm across iterations so only evaluation is measured.
pub struct BoaEngine {
    context: Context,
    wrapped: String,
    previewed: bool,
}

impl BoaEngine {
    pub fn new(script_path: &Path, code: &str) -> BenchResult<Self> {
        let bundled = bundle_companions(script_path, code)?;
        Ok(BoaEngine {
            context: Context::default(),
            wrapped: wrap_for_capture(&bundled, false),
            previewed: false,
        })
    }
}

impl Engine for BoaEngine {
    fn name(&self) -> &str {
        "boa"
    }

    fn execute(&mut self) -> BenchResult<(Duration, Payload)> {
        let start = Instant::now();
        let value = self
            .context
            .eval(Source::from_bytes(self.wrapped.as_bytes()))
            .map_err(|e| BenchError::engine("boa", e))?;
        self.context.run_jobs();
        let elapsed = start.elapsed();

        let text = value
            .to_string(&mut self.context)
            .map_err(|e| BenchError::engine("boa", e))?
            .to_std_string_escaped();
        let payload = normalize(serde_json::Value::String(text));

        if !self.previewed {
            self.previewed = true;
            log_first_run_preview(self.name(), &payload);
        }
        debug!(engine = self.name(), ms = elapsed.as_secs_f64() * 1000.0, "run complete");
        Ok((elapsed, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine_for(code: &str) -> BoaEngine {
        BoaEngine::new(Path::new("demos/inline.js"), code).unwrap()
    }

    #[test]
    fn test_simple_expression_result() {
        let mut engine = engine_for("return 1 + 1;");
        let (_, payload) = engine.execute().unwrap();
        assert_eq!(payload.result, json!(2));
        assert!(payload.logs.is_empty());
    }

    #[test]
    fn test_console_output_is_captured() {
        let mut engine = engine_for("console.log('hi'); return null;");
        let (_, payload) = engine.execute().unwrap();
        assert_eq!(payload.result, serde_json::Value::Null);
        assert_eq!(payload.rendered_logs(), vec!["hi".to_string()]);
    }

    #[test]
    fn test_thrown_error_surfaces_as_failure() {
        let mut engine = engine_for("throw new Error('boom');");
        let err = engine.execute().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_context_persists_across_runs() {
        let mut engine = engine_for("return [1, 2, 3].length;");
        for _ in 0..3 {
            let (_, payload) = engine.execute().unwrap();
            assert_eq!(payload.result, json!(3));
        }
    }
}
