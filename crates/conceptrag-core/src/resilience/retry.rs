//! Retry with exponential backoff and jitter
//!
//! Retries only errors classified retryable (transient I/O and
//! equivalents); validation and not-found surface immediately.

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry tuning per operation name
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Backoff for the given attempt (0-based), jittered up to +50%
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.0..=0.5);
        exp.mul_f64(1.0 + jitter).min(self.max_delay)
    }
}

/// Run an operation with retries. `op` is re-invoked per attempt.
pub async fn run_with_retry<T, F, Fut>(config: &RetryConfig, op: &F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < config.max_retries => {
                let delay = config.backoff(attempt);
                tracing::debug!(attempt, ?delay, error = %error, "retrying after failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
