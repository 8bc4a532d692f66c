//! Exponential backoff around transient external failures.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Backoff policy for one call site.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Base delay, doubled each retry.
    pub base_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }
}

/// Run an operation, retrying transient errors with backoff.
///
/// Non-transient errors (content policy, planning, validation) pass through
/// on the first occurrence.
pub async fn with_backoff<F, Fut, T>(
    policy: &BackoffPolicy,
    operation_name: &str,
    operation: F,
) -> PipelineResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                debug!(
                    "{} attempt {}/{} failed, retrying in {:?}: {}",
                    operation_name, attempt, policy.max_attempts, delay, e
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
