//! Report building and rendering for a finished benchmark run.
//!
//! One [`BenchReport`] per script: engine outcomes, checker findings, host
//! information, and a stable machine-readable JSON form for tooling.

use std::path::Path;

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::check::{check_completion, verify_result};
use crate::payload::{format_result, summarize_logs, Payload};
use crate::{
    collect_system_info, sha256_hex, summarize_timings, BenchError, BenchResult, EngineOutcome,
    SystemInfo, TimingSummary,
};

/// One engine's slice of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineReport {
    pub engine: String,
    pub times_ms: Vec<f64>,
    pub summary: Option<TimingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    pub issues: Vec<String>,
}

/// Full record of benchmarking one script across every registered engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub script: String,
    pub script_sha256: String,
    pub generated_at: String,
    pub iterations: usize,
    pub system: SystemInfo,
    pub engines: Vec<EngineReport>,
}

/// Assemble the report: per-engine stats plus completion and verification
/// findings for every captured payload.
pub fn build_report(
    script_path: &Path,
    code: &str,
    iterations: usize,
    outcomes: Vec<EngineOutcome>,
) -> BenchReport {
    let script = script_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    let script_id = script_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let engines = outcomes
        .into_iter()
        .map(|outcome| {
            let issues = match &outcome.payload {
                Some(payload) => {
                    let mut issues = check_completion(payload, &script_id);
                    issues.extend(verify_result(payload, &script_id));
                    issues
                }
                None => Vec::new(),
            };
            EngineReport {
                engine: outcome.name.clone(),
                times_ms: outcome.times_ms(),
                summary: summarize_timings(&outcome.timings),
                error: outcome.error,
                payload: outcome.payload,
                issues,
            }
        })
        .collect();

    BenchReport {
        script,
        script_sha256: sha256_hex(code.as_bytes()),
        generated_at: rfc3339_now(),
        iterations,
        system: collect_system_info(),
        engines,
    }
}

/// Render the human-facing comparison to a string.
pub fn render(report: &BenchReport) -> String {
    let mut out = String::new();
    let push = |out: &mut String, line: String| {
        out.push_str(&line);
        out.push('\n');
    };

    push(
        &mut out,
        format!("\n{} {}", "=== Benchmark:".bold(), report.script.bold()),
    );
    push(
        &mut out,
        format!(
            "fingerprint {}  generated {}",
            &report.script_sha256[..12.min(report.script_sha256.len())],
            report.generated_at
        ),
    );
    if let Some(cpu) = &report.system.cpu_model {
        push(&mut out, format!("host {cpu}"));
    }

    push(&mut out, format!("\n{}", "Results".bold().underline()));
    for engine in &report.engines {
        match (&engine.summary, &engine.error) {
            (Some(summary), _) => {
                push(
                    &mut out,
                    format!(
                        "  {:<10} mean {:>9.3} ms  median {:>9.3} ms  min {:>9.3} ms  max {:>9.3} ms  ({} runs)",
                        engine.engine.green(),
                        summary.mean_ms,
                        summary.median_ms,
                        summary.min_ms,
                        summary.max_ms,
                        summary.samples
                    ),
                );
            }
            (None, Some(error)) => {
                push(
                    &mut out,
                    format!("  {:<10} {} {}", engine.engine.red(), "FAILED:".red().bold(), error),
                );
            }
            (None, None) => {
                push(&mut out, format!("  {:<10} no samples", engine.engine.yellow()));
            }
        }
    }

    push(&mut out, format!("\n{}", "Captured output".bold().underline()));
    for engine in &report.engines {
        let Some(payload) = &engine.payload else {
            continue;
        };
        push(&mut out, format!("  {}:", engine.engine.cyan()));
        push(&mut out, format!("    result: {}", format_result(&payload.result)));
        for line in summarize_logs(&payload.logs).lines() {
            push(&mut out, format!("    {line}"));
        }
        for issue in &engine.issues {
            push(&mut out, format!("    {} {}", "issue:".yellow().bold(), issue));
        }
    }

    if let Some((fastest, slowest)) = fastest_and_slowest(report) {
        push(&mut out, format!("\n{}", "Performance".bold().underline()));
        push(
            &mut out,
            format!(
                "  fastest {} ({:.3} ms mean), slowest {} ({:.3} ms mean)",
                fastest.engine.green().bold(),
                mean_of(fastest),
                slowest.engine.red(),
                mean_of(slowest)
            ),
        );
        let fast_mean = mean_of(fastest);
        if fast_mean > 0.0 {
            push(
                &mut out,
                format!("  slowest/fastest ratio: {:.2}x", mean_of(slowest) / fast_mean),
            );
        }
    }

    out
}

/// Write the machine-readable report next to the human rendering.
pub fn write_json(report: &BenchReport, path: &Path) -> BenchResult<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| BenchError::Message(format!("failed to serialize report: {e}")))?;
    std::fs::write(path, json).map_err(|e| {
        BenchError::Message(format!("failed to write report {}: {e}", path.display()))
    })?;
    info!(path = %path.display(), "wrote JSON report");
    Ok(())
}

fn mean_of(engine: &EngineReport) -> f64 {
    engine.summary.as_ref().map(|s| s.mean_ms).unwrap_or(0.0)
}

/// The successful engines with the lowest and highest mean, when at least
/// two engines produced samples.
fn fastest_and_slowest(report: &BenchReport) -> Option<(&EngineReport, &EngineReport)> {
    let mut ranked: Vec<&EngineReport> = report
        .engines
        .iter()
        .filter(|e| e.summary.is_some())
        .collect();
    if ranked.len() < 2 {
        return None;
    }
    ranked.sort_by(|a, b| mean_of(a).total_cmp(&mean_of(b)));
    Some((ranked[0], ranked[ranked.len() - 1]))
}

fn rfc3339_now() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
