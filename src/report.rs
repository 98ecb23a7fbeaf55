//! # Run Results
//!
//! Serializable records the engine emits for downstream report writers
//! (PDF/email/HTML generation lives outside this crate).

use serde::Serialize;

/// Outcome of a single scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub duration_ms: u128,
    /// Diagnostic of the failing assertion or error, when the scenario
    /// failed.
    pub failure: Option<String>,
}

impl ScenarioResult {
    pub fn passed(name: impl Into<String>, duration_ms: u128) -> Self {
        Self {
            name: name.into(),
            passed: true,
            duration_ms,
            failure: None,
        }
    }

    pub fn failed(
        name: impl Into<String>,
        duration_ms: u128,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            duration_ms,
            failure: Some(failure.into()),
        }
    }
}

/// Aggregate over a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u128,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ScenarioResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.duration_ms += result.duration_ms;
        self.results.push(result);
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total as f64
    }
}
