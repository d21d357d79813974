//! Caller-side retry policy for scrape attempts.
//!
//! The pipeline itself never retries; a caller wrapping multiple attempts
//! owns the backoff policy. This helper retries only [`ScrapeError::Unreachable`]
//! failures. NotFound, Blocked, Unparseable and Storage are terminal and
//! returned immediately, so a bot challenge is never hammered.

use crate::error::ScrapeError;
use crate::Result;
use std::future::Future;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay for exponential backoff (in seconds)
    pub base_delay: u64,
    /// Maximum delay cap (in seconds)
    pub max_delay: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 5,
            max_delay: 300, // 5 minutes
        }
    }
}

/// Result of a retry operation with context
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub result: T,
    /// Number of retry attempts made
    pub attempts_made: u32,
}

/// Execute a scrape operation, retrying unreachable-page failures with
/// exponential backoff.
pub async fn retry_scrape<T, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => {
                return Ok(RetryResult {
                    result,
                    attempts_made: retries,
                });
            }
            Err(ScrapeError::Unreachable(reason)) => {
                if retries >= config.max_retries {
                    log::warn!(
                        "Max retries ({}) exceeded for {operation_name} operation",
                        config.max_retries
                    );
                    return Err(ScrapeError::Unreachable(reason));
                }

                let delay = std::cmp::min(
                    config.base_delay.saturating_mul(2_u64.pow(retries)),
                    config.max_delay,
                );
                log::info!(
                    "{operation_name} unreachable ({reason}), retrying in {delay}s (attempt {} of {})",
                    retries + 1,
                    config.max_retries
                );
                tokio::time::sleep(tokio::time::Duration::from_secs(delay)).await;
                retries += 1;
            }
            Err(other_error) => return Err(other_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: 0,
            max_delay: 1,
        }
    }

    #[tokio::test]
    async fn successful_operation_makes_no_retries() {
        let result = retry_scrape(fast_config(3), "test", || async {
            Ok::<i32, ScrapeError>(42)
        })
        .await
        .unwrap();

        assert_eq!(result.result, 42);
        assert_eq!(result.attempts_made, 0);
    }

    #[tokio::test]
    async fn unreachable_is_retried_until_success() {
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result = retry_scrape(fast_config(3), "test", move || {
            let count = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(ScrapeError::Unreachable("flaky".to_string()))
                } else {
                    Ok::<i32, ScrapeError>(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.result, 42);
        assert_eq!(result.attempts_made, 2);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_the_last_error() {
        let result = retry_scrape(fast_config(2), "test", || async {
            Err::<i32, ScrapeError>(ScrapeError::Unreachable("down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(ScrapeError::Unreachable(_))));
    }

    #[tokio::test]
    async fn blocked_is_terminal_and_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result = retry_scrape(fast_config(5), "test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, ScrapeError>(ScrapeError::Blocked) }
        })
        .await;

        assert!(matches!(result, Err(ScrapeError::Blocked)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_found_is_terminal_and_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result = retry_scrape(fast_config(5), "test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, ScrapeError>(ScrapeError::NotFound("X - Y".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ScrapeError::NotFound(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
