//! Retry policy applied at every I/O boundary of the sync.
//!
//! Only errors classified as transient are retried; everything else is
//! returned on the first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use movies_indexer_repository::{SearchIndexError, SourceError};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::warn;

/// Classification of errors into retryable and permanent.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for SourceError {
    fn is_transient(&self) -> bool {
        SourceError::is_transient(self)
    }
}

impl Transient for SearchIndexError {
    fn is_transient(&self) -> bool {
        SearchIndexError::is_transient(self)
    }
}

/// Exponential backoff schedule with an optional attempt cap.
///
/// With `max_attempts` unset a transient failure is retried forever. That
/// suits a long-running sync waiting out an outage, but a cap should be set
/// wherever a stuck cycle must eventually surface.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor between consecutive delays.
    pub factor: u64,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Total attempts including the first one; `None` retries forever.
    pub max_attempts: Option<usize>,
    /// Randomize delays to spread reconnects.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            factor: 2,
            max_delay: Duration::from_secs(30),
            max_attempts: None,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: Some(1),
            ..Self::default()
        }
    }

    /// Delays between attempts.
    fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        // ExponentialBackoff yields growth^n * scale milliseconds, n >= 1.
        let growth = self.factor.max(2);
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let scale = (initial_ms / growth).max(1);
        let backoff = ExponentialBackoff::from_millis(growth)
            .factor(scale)
            .max_delay(self.max_delay);

        let delays: Box<dyn Iterator<Item = Duration> + Send> = if self.jitter {
            Box::new(backoff.map(jitter))
        } else {
            Box::new(backoff)
        };

        match self.max_attempts {
            Some(attempts) => Box::new(delays.take(attempts.saturating_sub(1))),
            None => delays,
        }
    }

    /// Run `action`, retrying transient failures according to the policy.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in retry logs
    /// * `action` - Produces a fresh attempt each time it is called
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt: u32 = 0;

        RetryIf::spawn(
            self.delays(),
            || {
                attempt += 1;
                let current = attempt;
                let future = action();
                async move {
                    let result = future.await;
                    if let Err(ref e) = result {
                        if e.is_transient() {
                            warn!(
                                operation = operation,
                                attempt = current,
                                error = %e,
                                "Transient failure, retrying"
                            );
                        }
                    }
                    result
                }
            },
            |e: &E| e.is_transient(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy(max_attempts: Option<usize>) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(1),
            factor: 2,
            max_delay: Duration::from_millis(10),
            max_attempts,
            jitter: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let calls = AtomicUsize::new(0);

        let result: Result<usize, TestError> = fast_policy(None)
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 4 {
                        Err(TestError { transient: true })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), TestError> = fast_policy(None)
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { transient: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_is_respected() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), TestError> = fast_policy(Some(3))
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { transient: true }) }
            })
            .await;

        assert!(result.unwrap_err().transient);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delays_grow_and_are_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            factor: 2,
            max_delay: Duration::from_millis(500),
            max_attempts: Some(6),
            jitter: false,
        };

        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(delays.len(), 5);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(500)));
        assert_eq!(delays.last(), Some(&Duration::from_millis(500)));
    }

    #[test]
    fn test_no_retry_policy_has_no_delays() {
        assert_eq!(RetryPolicy::no_retry().delays().count(), 0);
    }
}
