//! Source wrapping: turn arbitrary user JavaScript into a self-contained,
//! instrumented program with a machine-parsable result.

use std::path::Path;

use crate::{BenchError, BenchResult};

/// Scripts whose source references companion files that must be textually
/// prepended before wrapping (every adapter except the server path, which
/// has module resolution of its own).
const COMPANIONS: &[(&str, &[&str])] = &[("matrix_bench.js", &["matrix_helpers.js"])];

const WRAPPER_TEMPLATE: &str = r#"
(function() {
  var __logs = [];
  var __origConsole = (typeof console !== "undefined") ? console : {};
  function __log() {
    var msg = Array.prototype.map.call(arguments, String).join(" ");
    __logs.push(msg);
    if (__origConsole.log) __origConsole.log.apply(__origConsole, arguments);
  }
  function __warn() {
    var msg = Array.prototype.map.call(arguments, String).join(" ");
    __logs.push("warn: " + msg);
    if (__origConsole.warn) __origConsole.warn.apply(__origConsole, arguments);
  }
  function __error() {
    var msg = Array.prototype.map.call(arguments, String).join(" ");
    __logs.push("error: " + msg);
    if (__origConsole.error) __origConsole.error.apply(__origConsole, arguments);
  }
  console = { log: __log, info: __log, warn: __warn, error: __error };
  var __result = null;
  try {
    __result = (function() { __USER_CODE__ })();
  } catch (e) {
    var stack = (e && e.stack) ? " | stack: " + e.stack : "";
    __logs.push("exception: " + e + stack);
    if (__origConsole.error) __origConsole.error("exception: " + e);
    throw e;
  }
  var __payload;
  try {
    __payload = JSON.stringify({ result: __result, logs: __logs });
  } catch (jsonErr) {
    __logs.push("serialization error: " + String(jsonErr));
    __payload = JSON.stringify({ result: String(__result), logs: __logs, error: String(jsonErr) });
  }
  if (__ECHO__ && __origConsole.log) __origConsole.log(__payload);
  return __payload;
})();
"#;

/// Wrap user code so that console output and the returned value are captured
/// and serialized as one JSON string, the value of the whole expression.
///
/// With `echo_stdout` the payload is additionally written through the
/// original console as the last line of native stdout, for adapters whose
/// only return channel is the process output stream.
pub fn wrap_for_capture(code: &str, echo_stdout: bool) -> String {
    WRAPPER_TEMPLATE
        .trim()
        .replace("__ECHO__", if echo_stdout { "true" } else { "false" })
        .replace("__USER_CODE__", code)
}

/// Prepend the source of any companion scripts the given script depends on.
///
/// Idempotent: companion text already present in `code` is not prepended
/// again. Scripts without registered companions pass through untouched.
pub fn bundle_companions(script_path: &Path, code: &str) -> BenchResult<String> {
    let Some(name) = script_path.file_name().and_then(|n| n.to_str()) else {
        return Ok(code.to_string());
    };
    let Some((_, companions)) = COMPANIONS.iter().find(|(script, _)| *script == name) else {
        return Ok(code.to_string());
    };

    let dir = script_path.parent().unwrap_or_else(|| Path::new("."));
    let mut bundled = String::new();
    for companion in companions.iter() {
        let path = dir.join(companion);
        let source = std::fs::read_to_string(&path).map_err(|e| {
            BenchError::Message(format!(
                "failed to read companion script {}: {e}",
                path.display()
            ))
        })?;
        if code.contains(source.trim()) {
            continue;
        }
        bundled.push_str(source.trim_end());
        bundled.push_str("\n\n");
    }
    bundled.push_str(code);
    Ok(bundled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_is_self_invoking_expression() {
        let wrapped = wrap_for_capture("return 1 + 1;", false);
        assert!(wrapped.starts_with("(function()"));
        assert!(wrapped.ends_with("})();"));
        assert!(wrapped.contains("return 1 + 1;"));
    }

    #[test]
    fn test_wrapper_shims_three_severity_levels() {
        let wrapped = wrap_for_capture("return null;", false);
        assert!(wrapped.contains("log: __log, info: __log, warn: __warn, error: __error"));
        assert!(wrapped.contains("\"warn: \" + msg"));
        assert!(wrapped.contains("\"error: \" + msg"));
    }

    #[test]
    fn test_wrapper_annotates_and_rethrows() {
        let wrapped = wrap_for_capture("throw new Error('boom');", false);
        assert!(wrapped.contains("__logs.push(\"exception: \" + e + stack)"));
        assert!(wrapped.contains("throw e;"));
    }

    #[test]
    fn test_wrapper_echo_flag() {
        let with_echo = wrap_for_capture("return 1;", true);
        let without = wrap_for_capture("return 1;", false);
        assert!(with_echo.contains("if (true && __origConsole.log)"));
        assert!(without.contains("if (false && __origConsole.log)"));
    }

    #[test]
    fn test_wrapper_serialization_fallback_present() {
        let wrapped = wrap_for_capture("return 1;", false);
        assert!(wrapped.contains("error: String(jsonErr)"));
        assert!(wrapped.contains("serialization error: "));
    }

    #[test]
    fn test_bundle_no_companions_is_noop() {
        let out = bundle_companions(Path::new("demos/fibonacci.js"), "return fib(10);").unwrap();
        assert_eq!(out, "return fib(10);");
    }

    #[test]
    fn test_bundle_prepends_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let helpers = "function matrixMultiply(a, b) { return a; }";
        std::fs::write(dir.path().join("matrix_helpers.js"), helpers).unwrap();
        let script = dir.path().join("matrix_bench.js");
        std::fs::write(&script, "return matrixMultiply([], []);").unwrap();

        let once = bundle_companions(&script, "return matrixMultiply([], []);").unwrap();
        assert!(once.starts_with(helpers));
        assert!(once.ends_with("return matrixMultiply([], []);"));

        let twice = bundle_companions(&script, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bundle_missing_companion_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("matrix_bench.js");
        let result = bundle_companions(&script, "return 1;");
        assert!(result.is_err());
    }
}
