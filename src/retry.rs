//! Bounded exponential backoff for transient failures

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::EngineResult;

/// Retry schedule: `max_attempts` tries, delay doubling from `base_delay`
/// up to `max_delay`, plus up to 10% jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn with_jitter(delay: Duration) -> Duration {
        let jitter_ms = (delay.as_millis() as u64 / 10).max(1);
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = RetryPolicy::with_jitter(policy.backoff(attempt));
                warn!(
                    operation = what,
                    attempt,
                    wait_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
