//! Bounded retry with exponential backoff.
//!
//! Terminal errors (client rejections, malformed responses) abort the loop on the
//! attempt that produced them; only transient failures wait and try again.

use crate::error::RetryableError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INITIAL_DELAY)
    }
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

    /// A policy with `max_attempts` total calls; zero is clamped to one.
    pub fn new(max_attempts: usize, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Wait inserted after the failed attempt with index `attempt` (0-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|shift| 1u32.checked_shl(shift))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    ///
    /// Returns the last observed error when every attempt fails.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let mut attempt = 0usize;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.is_terminal() {
                debug!(attempt, error = %err, "Terminal failure, not retrying");
                return Err(err);
            }

            if attempt + 1 >= self.max_attempts {
                warn!(
                    attempts = self.max_attempts,
                    error = %err,
                    "Retry budget exhausted"
                );
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, backing off"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
