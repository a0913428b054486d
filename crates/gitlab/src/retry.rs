//! Bounded exponential backoff for transient platform failures.
//!
//! Only [`PlatformError::Unavailable`] is retried. Every other failure is
//! returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{PlatformError, ProvisionError};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per step, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Calculate the next backoff delay, clamped to `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempts run out.
    ///
    /// `resource` names what is being provisioned, for logs and errors.
    pub async fn run<T, F, Fut>(&self, resource: &str, mut op: F) -> Result<T, ProvisionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PlatformError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    if attempt >= max_attempts {
                        tracing::error!(resource, attempts = attempt, error = %e, "Giving up on platform");
                        return Err(ProvisionError::RetriesExhausted {
                            resource: resource.to_string(),
                            attempts: attempt,
                        });
                    }
                    tracing::warn!(
                        resource,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Platform unavailable, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                }
                Err(e) => {
                    return Err(ProvisionError::Platform {
                        resource: resource.to_string(),
                        source: e,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            ..Default::default()
        }
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        let expected = [2, 4, 8, 16, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = policy.next_delay(delay);
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast(5)
            .run("group CS101", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PlatformError::Unavailable { status: 502 })
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(3)
            .run("group CS101", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PlatformError::Unavailable { status: 503 })
            })
            .await;

        assert!(matches!(
            result,
            Err(ProvisionError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(5)
            .run("project lab", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PlatformError::PermissionDenied {
                    status: 403,
                    body: "forbidden".into(),
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(ProvisionError::Platform {
                source: PlatformError::PermissionDenied { .. },
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(0)
            .run("user alice", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PlatformError::Unavailable { status: 504 })
            })
            .await;

        assert!(matches!(
            result,
            Err(ProvisionError::RetriesExhausted { attempts: 1, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
