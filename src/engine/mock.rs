//! Mock engine for exercising the harness and report without a runtime.

use std::time::Duration;

use crate::engine::Engine;
use crate::payload::Payload;
use crate::{BenchError, BenchResult};

/// Behavior knobs for [`MockEngine`].
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Payload returned by every successful call.
    pub payload: Payload,
    /// Sleep this long per call so timings are observable.
    pub delay: Duration,
    /// Fail (with this reason) starting at the given zero-based call index.
    pub fail_from: Option<(usize, String)>,
}

impl MockConfig {
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_from(mut self, call: usize, reason: impl Into<String>) -> Self {
        self.fail_from = Some((call, reason.into()));
        self
    }
}

pub struct MockEngine {
    name: String,
    config: MockConfig,
    calls: usize,
}

impl MockEngine {
    pub fn new(name: impl Into<String>, config: MockConfig) -> Self {
        MockEngine {
            name: name.into(),
            config,
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> BenchResult<(Duration, Payload)> {
        let call = self.calls;
        self.calls += 1;
        if let Some((from, reason)) = &self.config.fail_from {
            if call >= *from {
                return Err(BenchError::engine(&self.name, reason));
            }
        }
        if !self.config.delay.is_zero() {
            std::thread::sleep(self.config.delay);
        }
        Ok((self.config.delay, self.config.payload.clone()))
    }
}
