//! # Retry Policy
//!
//! Decides, after each failed attempt, whether the client tries again and
//! how long it waits first. Attempt 0 is the initial try; retries are
//! attempts `1 .. max_attempts - 1`.

use std::collections::HashSet;
use std::time::Duration;

use super::method::HttpMethod;

/// What a single attempt produced, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A complete response with this status code.
    Status(u16),
    /// The wall-clock timeout expired.
    Timeout,
    /// Connection-level failure before a response arrived.
    ConnectionError,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the initial try; `1` means no retries.
    pub max_attempts: u32,
    /// Base backoff in seconds; the delay doubles per retry.
    pub backoff_factor: f64,
    pub retry_statuses: HashSet<u16>,
    pub retry_methods: HashSet<HttpMethod>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
            retry_statuses: [429, 500, 502, 503, 504].into_iter().collect(),
            retry_methods: HttpMethod::ALL.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_factor,
            ..Self::default()
        }
    }

    /// Backoff before retry attempt `n` (n ≥ 1): `backoff_factor · 2^(n-1)`
    /// seconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_secs_f64(self.backoff_factor * f64::from(1u32 << exponent))
    }

    /// Given that attempt `attempt` (0-based) just finished with `outcome`,
    /// return the delay before the next attempt, or `None` to stop.
    pub fn should_retry(
        &self,
        attempt: u32,
        method: HttpMethod,
        outcome: AttemptOutcome,
    ) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        if !self.retry_methods.contains(&method) {
            return None;
        }
        let transient = match outcome {
            AttemptOutcome::Status(code) => self.retry_statuses.contains(&code),
            AttemptOutcome::Timeout | AttemptOutcome::ConnectionError => true,
        };
        transient.then(|| self.backoff(attempt + 1))
    }
}
