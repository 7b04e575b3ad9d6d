//! Retry and reconnect pacing.
//!
//! `RetryPolicy` is the bounded fixed-delay loop used for the initial
//! snapshot; `Backoff` is the doubling delay between realtime reconnects.
//! Both only sleep through `tokio::time`, so tests drive them with a paused
//! clock.

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_SNAPSHOT_ATTEMPTS: u32 = 5;
pub const DEFAULT_SNAPSHOT_DELAY: Duration = Duration::from_millis(1000);

pub const DEFAULT_RECONNECT_MIN: Duration = Duration::from_millis(1000);
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_millis(10_000);

/// Fixed-delay retry with a hard attempt ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Run `op` until it succeeds or the attempt budget is spent, returning
    /// the last error in the latter case. `op` receives the 1-based attempt
    /// number.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt once all attempts failed.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(what, attempt, error = %e, "retry: giving up");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(what, attempt, delay = ?self.delay, error = %e, "retry: attempt failed");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_ATTEMPTS, DEFAULT_SNAPSHOT_DELAY)
    }
}

/// Exponential backoff between reconnect attempts, capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self { min, max, current: min }
    }

    /// Delay to wait now; doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Back to the minimum, after a connection succeeded.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_MIN, DEFAULT_RECONNECT_MAX)
    }
}
