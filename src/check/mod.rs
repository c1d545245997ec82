//! Completion and verification heuristics over captured payloads.
//!
//! Pure functions: same payload and script id, same issue list. Issues are
//! advisory strings surfaced in the report, never failures.

use serde_json::Value;

use crate::payload::Payload;

/// Required log markers for scripts the suite knows about, keyed by the
/// script's file stem.
struct ScriptMarkers {
    start: &'static str,
    finish: &'static str,
    /// Substrings that must each appear at least this many times.
    min_counts: &'static [(&'static str, usize)],
}

const MARKERS: &[(&str, ScriptMarkers)] = &[
    (
        "sort_bench",
        ScriptMarkers {
            start: "sort start",
            finish: "sort finished",
            min_counts: &[],
        },
    ),
    (
        "matrix_bench",
        ScriptMarkers {
            start: "matrix start",
            finish: "matrix finished",
            min_counts: &[("multiply", 3)],
        },
    ),
];

/// Scan captured logs for trouble markers and, for known scripts, for the
/// expected progress markers.
pub fn check_completion(payload: &Payload, script_id: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let logs = payload.rendered_logs();

    for line in &logs {
        let lowered = line.to_lowercase();
        if lowered.contains("exception") {
            issues.push(format!("log line reports an exception: {}", preview(line)));
        } else if lowered.contains("error") {
            issues.push(format!("log line reports an error: {}", preview(line)));
        }
    }

    if let Some((_, markers)) = MARKERS.iter().find(|(id, _)| *id == script_id) {
        let has_start = logs.iter().any(|l| l.contains(markers.start));
        let has_finish = logs.iter().any(|l| l.contains(markers.finish));
        if has_start && !has_finish {
            issues.push(format!(
                "script logged '{}' but never '{}': likely terminated early",
                markers.start, markers.finish
            ));
        }
        for (needle, min) in markers.min_counts {
            let count = logs.iter().filter(|l| l.contains(needle)).count();
            if count < *min {
                issues.push(format!(
                    "expected at least {min} log lines containing '{needle}', saw {count}"
                ));
            }
        }
    }

    issues
}

/// Check the payload's optional verification object against script-specific
/// expectations. No verification data means no issues.
pub fn verify_result(payload: &Payload, script_id: &str) -> Vec<String> {
    let Some(verification) = payload.verification() else {
        return Vec::new();
    };
    let mut issues = Vec::new();

    if script_id == "json_stress" {
        match verification.get("iterations").and_then(Value::as_u64) {
            Some(1000) => {}
            Some(n) => issues.push(format!("verification reports {n} iterations, expected 1000")),
            None => issues.push("verification is missing the iteration count".to_string()),
        }
        let item_count = verification
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        if item_count == 0 {
            issues.push("verification item sample is empty".to_string());
        }
        let has_timestamp = verification
            .get("completed_at")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !has_timestamp {
            issues.push("verification is missing a completion timestamp".to_string());
        }
    }

    issues
}

fn preview(line: &str) -> String {
    const MAX: usize = 120;
    if line.chars().count() <= MAX {
        return line.to_string();
    }
    let truncated: String = line.chars().take(MAX).collect();
    format!("{truncated}...")
}
