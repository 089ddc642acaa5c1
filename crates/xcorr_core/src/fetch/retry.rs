//! Bounded retry with exponential backoff.
//!
//! The combinator knows nothing about waveforms: a classifier decides which
//! errors are worth another attempt and the outcome is returned as a tagged
//! value instead of an error.

use std::future::Future;
use std::time::Duration;

use crate::cancel::CancelHandle;

/// How an attempt's error should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Try again if attempts remain.
    Retryable,
    /// Stop immediately; another attempt cannot succeed.
    Terminal,
}

/// Attempt bound and backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Policy with no delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_backoff)
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Success(T),
    /// An attempt failed with a terminal error.
    Terminal(E),
    /// Every attempt failed with a retryable error; carries the last one.
    Exhausted { attempts: u32, last_error: E },
    /// Cancellation was requested before an attempt finished.
    Cancelled,
}

/// Run `op` until it succeeds, fails terminally, or attempts run out.
///
/// `op` receives the 1-based attempt number. Cancellation is checked while
/// an attempt is in flight and while backing off.
pub async fn retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    cancel: &CancelHandle,
    classify: C,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorClass,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RetryOutcome::Cancelled,
            result = op(attempt) => result,
        };

        let error = match result {
            Ok(value) => return RetryOutcome::Success(value),
            Err(e) => e,
        };

        if classify(&error) == ErrorClass::Terminal {
            return RetryOutcome::Terminal(error);
        }

        if attempt >= max_attempts {
            return RetryOutcome::Exhausted {
                attempts: attempt,
                last_error: error,
            };
        }

        let delay = policy.backoff_after(attempt);
        tracing::warn!(
            "Attempt {} of {} failed: {}; retrying in {:?}",
            attempt,
            max_attempts,
            error,
            delay
        );

        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        attempt += 1;
    }
}
