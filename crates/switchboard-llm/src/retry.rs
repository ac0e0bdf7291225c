//! Exponential backoff with jitter

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use switchboard_config::RetryConfig;
use tokio_util::sync::CancellationToken;

/// Backoff parameters shared by the buffered and streaming paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Scale each computed delay by a random factor in `[0.5, 1.0]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^(attempt - 1), max)` for a 1-based attempt number
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.scaled(attempt.saturating_sub(1))
    }

    /// Delay before retrying the buffered path after `attempt` failed
    ///
    /// A provider hint replaces the computed backoff; jitter applies either way.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let delay = hint.unwrap_or_else(|| self.backoff(attempt));
        if self.jitter {
            delay.mul_f64(rand::rng().random_range(0.5..=1.0))
        } else {
            delay
        }
    }

    /// Delay before retrying the streaming path after `attempt` failed
    ///
    /// The provider hint if present, else `base * 2^attempt` capped at the
    /// maximum. No jitter.
    pub fn stream_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        hint.unwrap_or_else(|| self.scaled(attempt))
    }

    fn scaled(&self, exponent: u32) -> Duration {
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// Cancellation is observed between attempts: a failure seen after
    /// `cancel` fired is not retried, and a backoff sleep ends early. Both
    /// yield `None`.
    ///
    /// # Errors
    ///
    /// Returns the last error when it is not retryable or no attempts remain
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
        retry_after: impl Fn(&E) -> Option<Duration>,
    ) -> Option<Result<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Some(Ok(value)),
                Err(_) if cancel.is_cancelled() => return None,
                Err(error) if attempt >= self.max_attempts || !is_retryable(&error) => return Some(Err(error)),
                Err(error) => error,
            };

            let delay = self.delay_for(attempt, retry_after(&error));
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying after failure"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
