//! Retry logic with exponential backoff.
//!
//! Provides a bounded retry loop for upstream calls:
//! - Exponential backoff (delay doubles each attempt, no jitter)
//! - Caller-supplied retry predicate
//! - Statistics tracking

use crate::config::ClientDefaults;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: ClientDefaults::MAX_RETRIES,
            base_delay: ClientDefaults::RETRY_BASE_DELAY,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of retries after the first attempt.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay to wait after the failed attempt numbered `retry` (0-indexed).
    ///
    /// `base_delay * 2^retry`, saturating instead of overflowing.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let multiplier = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total backoff delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if any attempt failed.
    pub last_error: Option<String>,
}

/// Run `operation`, retrying failures that satisfy `should_retry`.
///
/// Attempts are strictly sequential: each retry starts only after the
/// previous attempt has failed and its backoff has elapsed. At most
/// `config.max_retries + 1` attempts are made; the last failure is returned
/// once the budget is spent.
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();
    let mut retry = 0;

    loop {
        stats.attempts = retry + 1;

        match operation().await {
            Ok(value) => {
                stats.success = true;
                if retry > 0 {
                    debug!("Operation succeeded after {} attempts", stats.attempts);
                }
                return (Ok(value), stats);
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());

                if !should_retry(&e) {
                    debug!("Error is not retryable: {}", e);
                    return (Err(e), stats);
                }

                if retry >= config.max_retries {
                    warn!(
                        "All {} attempts exhausted. Last error: {}",
                        stats.attempts, e
                    );
                    return (Err(e), stats);
                }

                let delay = config.calculate_delay(retry);
                stats.total_delay += delay;

                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    stats.attempts,
                    config.max_retries + 1,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
                retry += 1;
            }
        }
    }
}
