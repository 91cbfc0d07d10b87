//! Stage-boundary retry policy
//!
//! Stages stay retry-agnostic; the coordinator applies this policy at its
//! I/O stage boundaries. The default is a single attempt: the external
//! scheduler owns retry counts and backoff, and re-invoking the whole
//! pipeline is always safe given the upsert semantics.

use std::future::Future;
use std::time::Duration;

use super::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per stage, including the first. 1 means no retry.
    pub max_attempts: u32,
    /// Base delay; attempt n waits n times this
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            ..RetryPolicy::default()
        }
    }

    /// Run a stage under this policy. Only retryable failures re-run;
    /// template drift (`HeaderNotFound`) fails immediately regardless.
    pub async fn run<T, F, Fut>(&self, stage: &str, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && err.is_retryable() => {
                    let delay = self.backoff * attempt;
                    log::warn!(
                        "Stage '{}' failed (attempt {}/{}), retrying in {:?}: {}",
                        stage,
                        attempt,
                        self.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        };

        let value = policy
            .run("resolving", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(PipelineError::source_unavailable("ref", "connection reset"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_template_drift_is_never_retried() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::ZERO,
        };

        let result: Result<(), _> = policy
            .run("extracting", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(PipelineError::HeaderNotFound {
                        sheet: "Sheet1".into(),
                        scanned: 20,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(PipelineError::HeaderNotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_policy_is_single_attempt() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::default()
            .run("persisting", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(PipelineError::source_unavailable("ref", "down")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
