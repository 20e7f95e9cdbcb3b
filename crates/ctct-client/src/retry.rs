//! Exponential backoff retry for API calls.

use crate::error::{CtctError, CtctResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// How 429s, 5xx responses and network failures are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = no retries).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            ..Self::default()
        }
    }

    /// Never retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// Whether `error` should be retried after `attempt` failed attempts.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &CtctError) -> bool {
        attempt < self.max_retries && (error.is_retryable() || error.is_server_error())
    }

    /// Delay before the next attempt.
    ///
    /// A 429 with `Retry-After` waits that long (capped); everything else
    /// backs off as `min(base * 2^attempt, max)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &CtctError) -> Duration {
        let ms = match error {
            CtctError::RateLimited {
                retry_after_secs: Some(secs),
            } => secs.saturating_mul(1000).min(self.max_delay_ms),
            _ => self
                .base_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt))
                .min(self.max_delay_ms),
        };
        Duration::from_millis(ms)
    }

    /// Run `f` until it succeeds, fails permanently, or retries run out.
    ///
    /// Exhausted retries surface [`CtctError::MaxRetriesExceeded`] wrapping the
    /// last error so the vendor payload stays reachable.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> CtctResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = CtctResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt = attempt + 1, "Succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        let retryable = error.is_retryable() || error.is_server_error();
                        if retryable && attempt > 0 {
                            warn!(
                                operation,
                                attempts = attempt + 1,
                                error = %error,
                                "Max retries exceeded"
                            );
                            return Err(CtctError::MaxRetriesExceeded {
                                operation: operation.to_string(),
                                attempts: attempt + 1,
                                last: Box::new(error),
                            });
                        }
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorPayload;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> CtctError {
        CtctError::Server {
            status: 503,
            payload: ApiErrorPayload::from_body(r#"[{"error_message":"unavailable"}]"#),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay_ms, 500);
        assert_eq!(policy.max_delay_ms, 30_000);
    }

    #[test]
    fn test_should_retry_classification() {
        let policy = RetryPolicy::new(2, 10);
        assert!(policy.should_retry(0, &server_error()));
        assert!(policy.should_retry(1, &CtctError::RateLimited { retry_after_secs: None }));
        assert!(!policy.should_retry(2, &server_error()));
        assert!(!policy.should_retry(0, &CtctError::NotFound("contact".into())));
        assert!(!policy.should_retry(0, &CtctError::Auth("nope".into())));
    }

    #[test]
    fn test_delay_backoff_and_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        let err = CtctError::Unreachable("host".into());
        assert_eq!(policy.delay_for(0, &err), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, &err), Duration::from_millis(400));
        assert_eq!(policy.delay_for(8, &err), Duration::from_millis(1_000));
    }

    #[test]
    fn test_delay_uses_retry_after() {
        let policy = RetryPolicy::new(3, 100);
        let err = CtctError::RateLimited {
            retry_after_secs: Some(2),
        };
        assert_eq!(policy.delay_for(0, &err), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_execute_retries_then_succeeds() {
        let policy = RetryPolicy::new(3, 0);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy
            .execute("op", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(server_error())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_wraps_exhausted_error() {
        let policy = RetryPolicy::new(2, 0);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = policy
            .execute("op", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(server_error()) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            CtctError::MaxRetriesExceeded { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            RetryPolicy::new(2, 0)
                .execute("op", || async { Err::<(), _>(server_error()) })
                .await
                .unwrap_err()
                .payload()
                .map(ApiErrorPayload::message),
            Some("unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_execute_permanent_error_not_retried() {
        let policy = RetryPolicy::new(5, 0);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = policy
            .execute("op", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(CtctError::NotFound("list".into())) }
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
