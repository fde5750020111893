//! Bounded retries with exponential backoff.

use crate::error::{Result, ScrapeError};
use crate::pacing::sleep_or_cancel;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trawler_core::RetryConfig;

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Runs an operation up to `max_attempts` times.
///
/// After failed attempt `i` (0-indexed) the policy waits `base_delay * 2^i`
/// before trying again. The final failure is returned as
/// [`ScrapeError::RetriesExhausted`]. Errors that are not
/// [retryable](ScrapeError::is_retryable) are returned at once.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    cancel: CancellationToken,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Create a policy. A budget of zero is treated as one attempt.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            cancel: CancellationToken::new(),
        }
    }

    /// Policy built from the `[retry]` section, using `max_retries`.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
        )
    }

    /// Same policy with a different attempt budget.
    #[must_use]
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Same policy with a different base delay.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Abort backoff waits when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait applied after failed attempt `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// # Errors
    /// Returns `ScrapeError::RetriesExhausted` wrapping the last error,
    /// a non-retryable error unchanged, or `ScrapeError::Cancelled`.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt + 1 >= self.max_attempts {
                tracing::warn!(
                    "{} failed after {} attempts: {}",
                    operation,
                    self.max_attempts,
                    error
                );
                return Err(ScrapeError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: self.max_attempts,
                    source: Box::new(error),
                });
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                "{} failed (attempt {}/{}), retrying in {:?}: {}",
                operation,
                attempt + 1,
                self.max_attempts,
                delay,
                error
            );
            sleep_or_cancel(delay, &self.cancel).await?;
            attempt += 1;
        }
    }
}
