//! Bounded Retry Policy - Exponential Backoff for Startup Connection
//!
//! Only the initial store connection is retried. Writes and reads issued
//! while serving requests are never retried; a dropped connection shows
//! up as degraded health instead.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Fatal startup failure: the process should exit non-zero.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Every attempt allowed by the policy failed.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },
}

/// Exponential backoff parameterized by (max attempts, initial delay,
/// multiplier), with an upper bound on any single delay.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always >= 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Growth factor applied to each subsequent delay.
    pub multiplier: f64,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[allow(clippy::cast_possible_wrap)]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    /// [`StartupError::RetriesExhausted`] carrying the last failure.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, StartupError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < attempts {
                        let delay = self.delay_after(attempt);
                        warn!(
                            operation,
                            attempt,
                            max_attempts = attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %last_error,
                            "Attempt failed, backing off"
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(StartupError::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
            last_error,
        })
    }
}
