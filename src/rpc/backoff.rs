/// Retry executor for provider calls
///
/// Failure handling by class:
/// - NonRetryable: returned immediately
/// - RateLimit: retried, delay doubles, a `RateLimitStatus` is broadcast
/// - Transient: retried with the same doubling delay
/// - Unknown: retried once as-is; a repeat is treated as Transient
///
/// `max_retries` counts retries after the first attempt. When they run out
/// the last error is returned inside `RpcError::RetriesExhausted`.
use crate::errors::{FailureClass, RpcError};
use crate::logger::{self, LogTag};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;

const STATUS_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// "retrying in Ns" notice for observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    /// Operation label, e.g. `getTransaction sig...`
    pub label: String,
    /// Retry number about to run, starting at 1
    pub attempt: u32,
    pub retry_in: Duration,
    pub reason: String,
}

impl std::fmt::Display for RateLimitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: rate limited, retrying in {:.1}s (retry #{})",
            self.label,
            self.retry_in.as_secs_f64(),
            self.attempt
        )
    }
}

pub struct BackoffExecutor {
    status_tx: broadcast::Sender<RateLimitStatus>,
    max_delay: Duration,
}

impl Default for BackoffExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY)
    }
}

impl BackoffExecutor {
    pub fn new(max_delay: Duration) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            status_tx,
            max_delay,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RateLimitStatus> {
        self.status_tx.subscribe()
    }

    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        max_retries: u32,
        initial_delay: Duration,
        mut operation: F,
    ) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut delay = initial_delay;
        let mut retries: u32 = 0;
        let mut unknown_seen = false;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if retries > 0 {
                        logger::debug(
                            LogTag::Backoff,
                            &format!("{} succeeded after {} retries", label, retries),
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let error = match error.class() {
                FailureClass::NonRetryable => {
                    logger::debug(
                        LogTag::Backoff,
                        &format!("{} failed with non-retryable error: {}", label, error),
                    );
                    return Err(error);
                }
                FailureClass::Unknown if unknown_seen => RpcError::Transient {
                    endpoint: String::new(),
                    message: error.message(),
                },
                FailureClass::Unknown => {
                    unknown_seen = true;
                    error
                }
                _ => error,
            };

            if retries >= max_retries {
                logger::warning(
                    LogTag::Backoff,
                    &format!("{} failed after {} attempts: {}", label, retries + 1, error),
                );
                return Err(RpcError::RetriesExhausted {
                    attempts: retries + 1,
                    last: Box::new(error),
                });
            }

            retries += 1;

            if error.class() == FailureClass::RateLimit {
                let status = RateLimitStatus {
                    label: label.to_string(),
                    attempt: retries,
                    retry_in: delay,
                    reason: error.message(),
                };
                logger::warning(LogTag::Backoff, &status.to_string());
                // No subscribers is fine
                let _ = self.status_tx.send(status);
            } else {
                logger::debug(
                    LogTag::Backoff,
                    &format!(
                        "{} failed ({}), retry #{} in {}ms",
                        label,
                        error,
                        retries,
                        delay.as_millis()
                    ),
                );
            }

            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2).min(self.max_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn rate_limited() -> RpcError {
        RpcError::RateLimited {
            endpoint: "mock".to_string(),
            message: "HTTP 429".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_429s_then_success() {
        let executor = BackoffExecutor::default();
        let mut status_rx = executor.subscribe();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = executor
            .execute("op", 5, Duration::from_secs(1), || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(rate_limited())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s
        assert_eq!(start.elapsed(), Duration::from_secs(7));

        let waits: Vec<Duration> = (0..3).map(|_| status_rx.try_recv().unwrap().retry_in).collect();
        assert_eq!(
            waits,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert!(status_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let executor = BackoffExecutor::default();
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = executor
            .execute("op", 5, Duration::from_secs(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RpcError::NonRetryable {
                        endpoint: "mock".to_string(),
                        code: Some(-32601),
                        message: "Method not found".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(RpcError::NonRetryable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let executor = BackoffExecutor::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), _> = executor
            .execute("op", 2, Duration::from_millis(100), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RpcError::Transient {
                        endpoint: "mock".to_string(),
                        message: "connection reset".to_string(),
                    })
                }
            })
            .await;

        match result {
            Err(RpcError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last.class(), FailureClass::Transient);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_retried_then_treated_as_transient() {
        let executor = BackoffExecutor::default();
        let result: Result<(), _> = executor
            .execute("op", 1, Duration::from_millis(10), || async {
                Err(RpcError::Unexpected {
                    endpoint: "mock".to_string(),
                    message: "weird".to_string(),
                })
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.class(), FailureClass::Transient);
        assert_eq!(err.message(), "weird");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_capped() {
        let executor = BackoffExecutor::new(Duration::from_secs(3));
        let start = Instant::now();
        let _: Result<(), _> = executor
            .execute("op", 3, Duration::from_secs(2), || async { Err(rate_limited()) })
            .await;
        // 2s + 3s + 3s
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }
}
