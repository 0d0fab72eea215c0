//! Bounded retry with exponential backoff.
//!
//! A single [`RetryPolicy`] describes every bounded wait in the pipeline:
//!
//! - Result notification: 20 attempts, 1s doubling to a 16s cap
//! - Pages liveness polling: 12 attempts, fixed 10s interval
//! - GitHub API calls: 4 attempts with 2s, 4s, 8s delays
//!
//! Delays are applied *between* attempts: never before the first attempt and
//! never after the last one.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Configuration for bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Cap for exponential growth.
    pub max_delay: Duration,

    /// Multiplier applied after each failed attempt (1.0 for a fixed interval).
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Result notification to the caller's callback URL.
    ///
    /// - 20 attempts with 1, 2, 4, 8, 16, 16, ... second delays
    pub const NOTIFY: Self = Self {
        max_attempts: 20,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    /// Polling a freshly enabled GitHub Pages site.
    pub const PAGES_LIVENESS: Self = Self::fixed(12, Duration::from_secs(10));

    /// GitHub REST calls that fail transiently (5xx, rate limits, network).
    ///
    /// - 4 attempts with 2s, 4s, 8s delays
    pub const GITHUB_API: Self = Self {
        max_attempts: 4,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// A policy that waits the same interval between every attempt.
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: interval,
            max_delay: interval,
            backoff_multiplier: 1.0,
        }
    }

    /// Returns a copy of this policy with a different attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Number of attempts actually made. A zero budget still makes one attempt.
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Computes the delay before retry number `retry` (0-indexed).
    ///
    /// `initial_delay * backoff_multiplier^retry`, capped at `max_delay`.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns an iterator over all delays between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.attempt_budget() - 1).map(|retry| self.delay_before_retry(retry))
    }

    /// Total time spent sleeping if every attempt fails.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::GITHUB_API
    }
}

/// Errors that know whether another attempt could succeed.
pub trait Retriable {
    fn is_retriable(&self) -> bool;
}

/// Result of driving an operation through a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded on attempt number `attempts`.
    Success { value: T, attempts: u32 },

    /// Every attempt failed with a retriable error.
    Exhausted { last_error: E, attempts: u32 },

    /// A non-retriable error stopped the loop early.
    Permanent { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    /// Converts to a Result, treating exhaustion and permanent errors as Err.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Exhausted { last_error, .. } => Err(last_error),
            RetryOutcome::Permanent { error, .. } => Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    /// Number of attempts made, whatever the outcome.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Permanent { attempts, .. } => *attempts,
        }
    }
}

/// Executes an async operation with bounded retry.
///
/// The operation is called until it succeeds, returns a non-retriable error,
/// or the policy's attempt budget is spent. Between failed attempts the task
/// sleeps for [`RetryPolicy::delay_before_retry`].
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    E: Retriable,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.attempt_budget();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) if !error.is_retriable() => {
                return RetryOutcome::Permanent {
                    error,
                    attempts: attempt,
                };
            }
            Err(last_error) => {
                if attempt >= max_attempts {
                    return RetryOutcome::Exhausted {
                        last_error,
                        attempts: attempt,
                    };
                }

                let delay = policy.delay_before_retry(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Retriable for TestError {
        fn is_retriable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    // ─── Unit Tests ───────────────────────────────────────────────────────────

    #[test]
    fn notify_delays_double_then_cap() {
        let delays: Vec<_> = RetryPolicy::NOTIFY.delays().map(|d| d.as_secs()).collect();

        assert_eq!(delays.len(), 19);
        assert_eq!(&delays[..7], &[1, 2, 4, 8, 16, 16, 16]);
        assert!(delays[4..].iter().all(|d| *d == 16));
    }

    #[test]
    fn pages_liveness_is_fixed_interval() {
        let policy = RetryPolicy::PAGES_LIVENESS;
        assert_eq!(policy.max_attempts, 12);
        assert!(policy.delays().all(|d| d == Duration::from_secs(10)));
        assert_eq!(policy.total_max_wait(), Duration::from_secs(110));
    }

    #[test]
    fn github_api_delays_are_2_4_8() {
        let delays: Vec<_> = RetryPolicy::GITHUB_API.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn zero_attempt_budget_still_makes_one_attempt() {
        let policy = RetryPolicy::NOTIFY.with_max_attempts(0);
        assert_eq!(policy.attempt_budget(), 1);
        assert_eq!(policy.delays().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_sleep() {
        let start = tokio::time::Instant::now();

        let outcome = retry_with_backoff(&RetryPolicy::NOTIFY, |_| async {
            Ok::<_, TestError>(42)
        })
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = retry_with_backoff(&RetryPolicy::NOTIFY, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(TestError::Fatal) }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Permanent { attempts: 1, .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_succeeds_on_third_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = tokio::time::Instant::now();

        let outcome = retry_with_backoff(&RetryPolicy::NOTIFY, move |_| {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(count)
                }
            }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Success { value: 2, attempts: 3 }));
        // 1s before attempt 2, 2s before attempt 3
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_does_not_sleep_after_last_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10), 2.0);
        let start = tokio::time::Instant::now();

        let outcome =
            retry_with_backoff(&policy, |_| async { Err::<(), _>(TestError::Transient) }).await;

        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 3, .. }));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn operation_receives_attempt_number() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let _ = retry_with_backoff(&RetryPolicy::fixed(3, Duration::from_millis(5)), move |n| {
            seen_clone.lock().unwrap().push(n);
            async { Err::<(), _>(TestError::Transient) }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    // ─── Property Tests ───────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn delay_never_exceeds_cap(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..60000,
            multiplier in 1.0f64..3.0,
            retry in 0u32..64,
        ) {
            let policy = RetryPolicy::new(
                10,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            prop_assert!(policy.delay_before_retry(retry) <= Duration::from_millis(max_ms));
        }

        #[test]
        fn delay_sequence_is_monotonic(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..60000,
            multiplier in 1.0f64..3.0,
            max_attempts in 1u32..25,
        ) {
            let policy = RetryPolicy::new(
                max_attempts,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            let delays: Vec<_> = policy.delays().collect();

            prop_assert_eq!(delays.len() as u32, max_attempts - 1);
            for window in delays.windows(2) {
                prop_assert!(window[1] >= window[0], "Delays should be monotonic");
            }
        }

        #[test]
        fn first_delay_equals_initial_delay(
            initial_ms in 1u64..10000,
            max_ms in 10000u64..100000,
            multiplier in 1.0f64..3.0,
        ) {
            let policy = RetryPolicy::new(
                5,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            prop_assert_eq!(policy.delay_before_retry(0), Duration::from_millis(initial_ms));
        }
    }
}
