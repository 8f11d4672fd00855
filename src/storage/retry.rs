use std::future::Future;
use std::time::Duration;

use bevy::prelude::*;

use super::repo::StoreError;

/// Bounded exponential backoff for store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, the first one included. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failure, doubled after each further one.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt + 1` (0-based failed attempt).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.min(31));
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempts run out.
/// `op` must be safe to repeat: a failed attempt may still have been applied.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{label} succeeded after {} attempts", attempt + 1);
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{label} failed (attempt {}/{attempts}): {e}, retrying in {delay:?}",
                    attempt + 1
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
