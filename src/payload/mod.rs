//! Canonical payload record shared by every engine adapter, plus the
//! normalizer that coerces whatever an engine hands back into that shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One captured console line. Engines that shim the console produce plain
/// strings; richer runtimes may report `{level, message}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogEntry {
    Structured { level: String, message: String },
    Text(String),
}

impl LogEntry {
    /// The log line as a single display string, level-prefixed when present.
    pub fn render(&self) -> String {
        match self {
            LogEntry::Structured { level, message } => format!("{level}: {message}"),
            LogEntry::Text(text) => text.clone(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LogEntry::Structured { message, .. } => message,
            LogEntry::Text(text) => text,
        }
    }
}

/// The machine-parsable record every adapter reduces an execution to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Payload {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_stats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Payload {
    /// Wrap a bare value as the payload's result with no logs.
    pub fn from_result(result: Value) -> Self {
        Payload {
            result,
            ..Default::default()
        }
    }

    /// The verification object, whether it arrived top-level or embedded in
    /// an object-shaped result.
    pub fn verification(&self) -> Option<&Value> {
        if let Some(v) = self.verification.as_ref() {
            return Some(v);
        }
        self.result.get("verification")
    }

    /// All log lines rendered for scanning and display.
    pub fn rendered_logs(&self) -> Vec<String> {
        self.logs.iter().map(LogEntry::render).collect()
    }
}

/// Coerce any JSON value into a canonical [`Payload`]. Total: every input
/// yields a payload.
///
/// Strings are parsed as payload JSON first (the wrapper protocol returns
/// the payload as a JSON string); unparsable strings become the raw result.
/// Objects carrying a `result` or `logs` key pass through canonically;
/// objects without either key, and objects whose entries do not match the
/// record shape, are wrapped whole as the result. Everything else is
/// wrapped as the result.
pub fn normalize(value: Value) -> Payload {
    match value {
        Value::Null => Payload::default(),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed @ Value::Object(_)) => normalize(parsed),
            _ => Payload::from_result(Value::String(text)),
        },
        Value::Object(ref map) => {
            if map.contains_key("result") || map.contains_key("logs") {
                match serde_json::from_value::<Payload>(value.clone()) {
                    Ok(payload) => payload,
                    Err(_) => Payload::from_result(value),
                }
            } else {
                Payload::from_result(value)
            }
        }
        other => Payload::from_result(other),
    }
}

/// Merge engine-level counters into the payload's `runtime_stats`, keeping
/// any keys the script itself reported. Non-object stats are preserved
/// under a `script_reported` key.
pub fn merge_runtime_stats(payload: &mut Payload, stats: Value) {
    let Value::Object(incoming) = stats else {
        return;
    };
    let mut merged = match payload.runtime_stats.take() {
        Some(Value::Object(existing)) => existing,
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("script_reported".to_string(), other);
            map
        }
        None => serde_json::Map::new(),
    };
    for (key, value) in incoming {
        merged.insert(key, value);
    }
    payload.runtime_stats = Some(Value::Object(merged));
}

const RESULT_PREVIEW_MAX: usize = 400;
const LOG_PREVIEW_LINES: usize = 5;

/// Compact single-line rendering of a result value, truncated for previews.
pub fn format_result(result: &Value) -> String {
    let text = match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_chars(&text, RESULT_PREVIEW_MAX)
}

/// Short multi-line summary of captured logs: first few lines plus a count
/// of what was elided.
pub fn summarize_logs(logs: &[LogEntry]) -> String {
    if logs.is_empty() {
        return "(no captured output)".to_string();
    }
    let mut lines: Vec<String> = logs
        .iter()
        .take(LOG_PREVIEW_LINES)
        .map(|entry| truncate_chars(&entry.render(), RESULT_PREVIEW_MAX))
        .collect();
    if logs.len() > LOG_PREVIEW_LINES {
        lines.push(format!("... ({} more lines)", logs.len() - LOG_PREVIEW_LINES));
    }
    lines.join("\n")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max).collect();
    format!("{truncated}...")
}
