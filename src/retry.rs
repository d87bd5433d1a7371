//! Bounded exponential backoff for calls to the scraping source.
//!
//! Scholar answers repeated requests with CAPTCHAs, so attempts are capped
//! and the wait grows between them.

use crate::error::{PublistError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry policy: wait after attempt `n` is `multiplier * 2^(n-1)`,
/// clamped to `[min_wait, max_wait]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base of the exponential wait
    pub multiplier: Duration,
    /// Lower bound on every wait
    pub min_wait: Duration,
    /// Upper bound on every wait
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits; for tests and offline sources.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier: Duration::ZERO,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Wait before the attempt following attempt number `attempt` (1-based).
    pub fn wait_after(&self, attempt: u32) -> Duration {
        let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.multiplier
            .saturating_mul(exp)
            .clamp(self.min_wait, self.max_wait.max(self.min_wait))
    }

    /// Run `operation` until it succeeds or the attempts run out.
    ///
    /// Every error is retried. After the last attempt the final error is
    /// wrapped in [`PublistError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < attempts => {
                    let wait = self.wait_after(attempt);
                    warn!(
                        operation = name,
                        attempt,
                        max_attempts = attempts,
                        wait_secs = wait.as_secs_f64(),
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(PublistError::RetriesExhausted {
                        operation: name.to_string(),
                        attempts,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}
