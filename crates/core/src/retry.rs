//! Retry policy shared by every remote service client.
//!
//! One [`RetryPolicy`] value carries the per-call timeout, the attempt budget
//! and the exponential backoff schedule. Errors decide for themselves whether
//! they are worth retrying through [`RetryableError`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::RetryConfig;

/// Classification hook for transport errors.
pub trait RetryableError: std::error::Error {
    /// Transient failures (rate limits, 5xx, timeouts, dropped connections).
    /// Deterministic client errors must return `false`.
    fn is_retryable(&self) -> bool;

    /// Error value for a call that exceeded the per-call timeout.
    fn timed_out(after: Duration) -> Self
    where
        Self: Sized;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1).
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            backoff_factor: 2.0,
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor.max(1.0),
            call_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    /// Single attempt, no backoff.
    pub fn no_retry(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            call_timeout,
            ..Self::default()
        }
    }

    /// Backoff before attempt `attempt + 1`, without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Run `call` until it succeeds, fails permanently, or the attempt budget
    /// is spent. Each attempt is bounded by `call_timeout`.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        E: RetryableError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.call_timeout)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(operation, attempt, error = %err, "permanent failure, not retrying");
                return Err(err);
            }
            if attempt >= max_attempts {
                warn!(operation, attempts = attempt, error = %err, "retry budget exhausted");
                return Err(err);
            }

            let delay = self.delay_for(attempt) + jitter(self.delay_for(attempt));
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Uniform in `0..=base/4`.
fn jitter(base: Duration) -> Duration {
    let span = base.as_millis() as u64 / 4;
    if span == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=span))
}
