//! Exponential backoff with jitter around remote calls.

use log::warn;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::aws::AwsResult;

/// Retry schedule for a single remote call.
///
/// The delay before the first retry is `initial_delay`; after every failed
/// attempt it is multiplied by `backoff_factor`, gets a random jitter in
/// `[0, max_jitter]` added, and is capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.5,
            max_delay: Duration::from_secs(60),
            max_jitter: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times without sleeping.
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(
                rand::thread_rng().gen_range(0.0..=self.max_jitter.as_secs_f64()),
            )
        };
        (current.mul_f64(self.backoff_factor) + jitter).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> AwsResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AwsResult<T>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:.1}s",
                        attempt,
                        self.max_attempts,
                        err,
                        delay.as_secs_f64()
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
