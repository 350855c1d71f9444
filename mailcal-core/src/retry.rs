//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::MailcalResult;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MULTIPLIER: Duration = Duration::from_secs(1);
const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(4);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Caps the exponent so the multiplication cannot overflow
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// How often, and how patiently, a failing operation is retried.
///
/// The wait after attempt `n` is `multiplier * 2^(n-1)`, clamped to
/// `[min_delay, max_delay]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            multiplier: DEFAULT_MULTIPLIER,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Result of an operation run under a [`RetryPolicy`]
#[derive(Debug)]
pub struct Retried<T> {
    pub result: MailcalResult<T>,
    /// Number of times the operation was started
    pub attempts: u32,
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times without waiting in between.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            multiplier: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before the attempt following attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let backoff = self.multiplier.saturating_mul(2_u32.pow(exponent));
        backoff.clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }

    /// Run `operation` until it succeeds, fails with a non-transient error, or
    /// the attempts are used up.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Retried<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = MailcalResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempts = attempt, "succeeded after retry");
                    }
                    return Retried {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay = ?delay,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Retried {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
