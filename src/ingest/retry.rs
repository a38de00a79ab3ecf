// src/ingest/retry.rs
use std::future::Future;
use std::time::Duration;

use crate::ingest::config::IngestConfig;
use crate::ingest::error::IngestError;

/// Bounded retry with exponential backoff, applied to transport failures only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &IngestConfig) -> Self {
        Self {
            max_attempts: cfg.max_retries.max(1),
            base_backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }

    /// Single attempt, no sleeping. Handy in tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
        }
    }

    fn backoff(&self, attempt: u8) -> Duration {
        // 1x, 2x, 4x ... capped so the shift cannot overflow
        self.base_backoff * (1u32 << u32::from(attempt.saturating_sub(1)).min(10))
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, IngestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IngestError>>,
    {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            match op().await {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let wait = self.backoff(attempt);
                    tracing::debug!(
                        target: "ingest",
                        error = %e,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "{what} failed, retrying"
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn timeout_err() -> IngestError {
        IngestError::transport(
            "http://x",
            std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
        )
    }

    #[tokio::test]
    async fn retries_transport_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::ZERO,
        };
        let out = policy
            .run("probe", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(timeout_err())
                } else {
                    Ok(7u32)
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::ZERO,
        };
        let out: Result<(), _> = policy
            .run("fetch", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout_err())
            })
            .await;
        assert!(out.unwrap_err().is_retryable());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn decode_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::ZERO,
        };
        let out: Result<(), _> = policy
            .run("fetch", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(IngestError::decode(2023, 3, "bad"))
            })
            .await;
        assert!(out.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(500),
        };
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(2000));
    }
}
