use std::future::Future;
use std::time::Duration;

use super::model::AiError;

/// Quota-aware retry loop shared by every AI stage.
///
/// `max_attempts` counts total calls, including the first one. Only failures
/// accepted by the `retryable` predicate are retried; anything else ends the
/// loop at once.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    retryable: fn(&AiError) -> bool,
    backoff: fn(u32) -> Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retryable: AiError::is_retryable,
            backoff: Self::quota_backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `k` (k >= 2): `2^(k-2) * 2 + 7` seconds,
    /// giving 9s, 11s, 15s, 23s, ...
    pub fn quota_backoff(attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2);
        let secs = 2u64
            .saturating_pow(exponent)
            .saturating_mul(2)
            .saturating_add(7);
        Duration::from_secs(secs)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    pub async fn run<T, F, Fut>(&self, stage: &'static str, mut operation: F) -> Result<T, AiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AiError>>,
    {
        let mut attempt = 1;

        loop {
            tracing::debug!(stage, attempt, max_attempts = self.max_attempts, "AI call");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(stage, attempt, "AI call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if (self.retryable)(&e) && attempt < self.max_attempts => {
                    attempt += 1;
                    let wait = (self.backoff)(attempt);
                    tracing::warn!(
                        stage,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "AI quota exceeded, retrying: {}",
                        e
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    tracing::error!(stage, attempt, "AI call failed: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
