//! Timing harness: drives one engine for a fixed number of iterations.
//!
//! Deliberately single-threaded. Engines run back to back on the calling
//! thread so that no scheduling noise lands inside the measured durations.

use tracing::{info, warn};

use crate::engine::Engine;
use crate::EngineOutcome;

/// Run `iterations` sequential calls against one engine.
///
/// Each call's wall-clock duration is recorded; only the most recent
/// payload is kept. The first failure stops this engine with empty timings
/// and the failure description; other engines are unaffected because the
/// outcome is self-contained.
pub fn run_engine(engine: &mut dyn Engine, iterations: usize) -> EngineOutcome {
    let name = engine.name().to_string();
    let mut outcome = EngineOutcome {
        name: name.clone(),
        ..Default::default()
    };

    info!(engine = %name, iterations, "benchmarking");
    for iteration in 0..iterations {
        match engine.execute() {
            Ok((elapsed, payload)) => {
                outcome.timings.push(elapsed);
                outcome.payload = Some(payload);
            }
            Err(e) => {
                warn!(engine = %name, iteration, "engine failed: {e}");
                outcome.timings.clear();
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }
    outcome
}

/// Run every engine in order, collecting one outcome per engine.
pub fn run_benchmarks(engines: &mut [Box<dyn Engine>], iterations: usize) -> Vec<EngineOutcome> {
    engines
        .iter_mut()
        .map(|engine| run_engine(engine.as_mut(), iterations))
        .collect()
}
