pub mod check;
pub mod engine;
pub mod harness;
pub mod payload;
pub mod report;
pub mod server;
pub mod wrap;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::Payload;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("{0}")]
    Message(String),
    #[error("script not found: {}", .0.display())]
    ScriptNotFound(std::path::PathBuf),
    #[error("engine {engine} failed: {reason}")]
    Engine { engine: String, reason: String },
    #[error("server failed to start (exit {exit:?}): {output}")]
    ServerStart { exit: Option<i32>, output: String },
    #[error("timed out waiting for the server to become ready")]
    ServerTimeout,
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    /// Build an engine failure carrying the engine name and underlying cause.
    pub fn engine(engine: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        BenchError::Engine {
            engine: engine.into(),
            reason: reason.to_string(),
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SystemInfo {
    pub cpu_model: Option<String>,
    pub cpu_cores_logical: Option<usize>,
    pub cpu_cores_physical: Option<usize>,
    pub total_ram_bytes: Option<u64>,
    pub os: Option<String>,
}

/// Outcome of benchmarking one engine: per-iteration wall-clock timings,
/// the most recent payload, and the failure description if the engine
/// stopped early. Created by the timing harness, read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct EngineOutcome {
    pub name: String,
    pub timings: Vec<Duration>,
    pub error: Option<String>,
    pub payload: Option<Payload>,
}

impl EngineOutcome {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn times_ms(&self) -> Vec<f64> {
        self.timings
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimingSummary {
    pub samples: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub stddev_ms: f64,
}

/// Compute summary statistics over per-iteration durations.
/// Returns `None` when there are no samples.
pub fn summarize_timings(timings: &[Duration]) -> Option<TimingSummary> {
    if timings.is_empty() {
        return None;
    }
    let mut ms: Vec<f64> = timings.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    ms.sort_by(|a, b| a.total_cmp(b));
    let len = ms.len() as f64;
    let sum: f64 = ms.iter().sum();
    let mean = sum / len;
    let median = if ms.len() % 2 == 1 {
        ms[ms.len() / 2]
    } else {
        (ms[ms.len() / 2 - 1] + ms[ms.len() / 2]) / 2.0
    };
    let var = ms.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / len;
    Some(TimingSummary {
        samples: ms.len(),
        mean_ms: mean,
        median_ms: median,
        min_ms: ms[0],
        max_ms: ms[ms.len() - 1],
        stddev_ms: var.sqrt(),
    })
}

// Shared helpers
pub fn collect_system_info() -> SystemInfo {
    use sysinfo::System;
    let mut sys = System::new_all();
    sys.refresh_all();
    let cpu_model = sys.cpus().first().map(|c| c.brand().to_string());
    let cpu_cores_logical = Some(sys.cpus().len());
    let cpu_cores_physical = sys.physical_core_count();
    let total_ram_bytes = Some(sys.total_memory());
    let os = System::name();
    SystemInfo {
        cpu_model,
        cpu_cores_logical,
        cpu_cores_physical,
        total_ram_bytes,
        os,
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}
