//! Retry Scheduler: bounded retries with exponential backoff.
//!
//! A policy is bounded either by a wall-clock deadline or by an attempt count.
//! Each attempt may additionally be capped by a per-attempt timeout; under a
//! deadline the cap never extends past the deadline itself. Cancellation is
//! cooperative: the token is raced against every attempt and every sleep, and
//! checked once more before a success is returned.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors that know whether another attempt could help.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBound {
    /// Stop once this much wall-clock time has elapsed since the first attempt.
    Deadline(Duration),
    /// Stop after this many attempts.
    MaxAttempts(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub bound: RetryBound,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Post-authentication account sync: 30s deadline.
    pub fn account_sync() -> Self {
        Self {
            bound: RetryBound::Deadline(Duration::from_secs(30)),
            initial_delay: Duration::from_millis(900),
            multiplier: 1.7,
            max_delay: Duration::from_millis(5000),
            attempt_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// The interactive "sync again" action: a few quick attempts.
    pub fn manual_resync() -> Self {
        Self {
            bound: RetryBound::MaxAttempts(3),
            initial_delay: Duration::from_millis(1000),
            multiplier: 1.5,
            max_delay: Duration::from_millis(4000),
            attempt_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Delay that follows `current`, capped at `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let factor = if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        };
        let nanos = (current.as_nanos() as f64 * factor).round();
        if nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos as u64)
    }
}

/// Receives progress for attempt-count / time-remaining reporting.
pub trait RetryObserver: Send + Sync {
    fn on_attempt(&self, _attempt: u32, _remaining: Option<Duration>) {}

    fn on_retry(&self, _attempt: u32, _delay: Duration, _error: &dyn fmt::Display) {}
}

/// Silent observer.
impl RetryObserver for () {}

/// A successful retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Deadline reached. `last_error` is `None` when the last attempt hit its timeout.
    #[error("operation is taking longer than expected (gave up after {attempts} attempts)")]
    TimedOut { attempts: u32, last_error: Option<E> },

    #[error("operation failed after {attempts} attempts")]
    Exhausted { attempts: u32, last_error: Option<E> },

    #[error("operation failed permanently: {0}")]
    Fatal(E),

    #[error("superseded before completion")]
    Cancelled,
}

/// Runs `action` until it succeeds, fails permanently, exhausts `policy`, or
/// `token` is cancelled. `action` receives the 1-based attempt number.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    observer: &dyn RetryObserver,
    mut action: F,
) -> Result<Retried<T>, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let started = Instant::now();
    let deadline = match policy.bound {
        RetryBound::Deadline(limit) => Some(started + limit),
        RetryBound::MaxAttempts(_) => None,
    };
    let max_attempts = match policy.bound {
        RetryBound::MaxAttempts(n) => Some(n.max(1)),
        RetryBound::Deadline(_) => None,
    };
    let mut delay = policy.initial_delay.min(policy.max_delay);
    let mut attempt: u32 = 0;
    let mut last_error: Option<E> = None;

    loop {
        if token.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if attempt > 0 && remaining.is_some_and(|r| r.is_zero()) {
            return Err(RetryError::TimedOut {
                attempts: attempt,
                last_error,
            });
        }

        attempt += 1;
        observer.on_attempt(attempt, remaining);
        let limit = match (policy.attempt_timeout, remaining) {
            (Some(per_attempt), Some(left)) => Some(per_attempt.min(left)),
            (per_attempt, left) => per_attempt.or(left),
        };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(RetryError::Cancelled),
            outcome = bounded(action(attempt), limit) => outcome,
        };

        match outcome {
            Ok(value) => {
                if deadline.is_some_and(|d| Instant::now() > d) {
                    return Err(RetryError::TimedOut {
                        attempts: attempt,
                        last_error,
                    });
                }
                if token.is_cancelled() {
                    return Err(RetryError::Cancelled);
                }
                let elapsed = started.elapsed();
                debug!(attempt, elapsed_ms = elapsed.as_millis() as u64, "attempt succeeded");
                return Ok(Retried {
                    value,
                    attempts: attempt,
                    elapsed,
                });
            }
            Err(Some(error)) if !error.is_retryable() => return Err(RetryError::Fatal(error)),
            Err(failure) => last_error = failure,
        }

        if max_attempts.is_some_and(|max| attempt >= max) {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last_error,
            });
        }

        let wait = match deadline {
            Some(d) => {
                let left = d.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(RetryError::TimedOut {
                        attempts: attempt,
                        last_error,
                    });
                }
                delay.min(left)
            }
            None => delay,
        };

        let failure = AttemptFailure(&last_error);
        warn!(
            attempt,
            retry_in_ms = wait.as_millis() as u64,
            error = %failure,
            "attempt failed, retrying"
        );
        observer.on_retry(attempt, wait, &failure);

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
        delay = policy.next_delay(delay);
    }
}

/// `Err(None)` means the attempt hit its timeout.
async fn bounded<T, E>(
    attempt: impl Future<Output = Result<T, E>>,
    limit: Option<Duration>,
) -> Result<T, Option<E>> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result.map_err(Some),
            Err(_) => Err(None),
        },
        None => attempt.await.map_err(Some),
    }
}

struct AttemptFailure<'a, E>(&'a Option<E>);

impl<E: fmt::Display> fmt::Display for AttemptFailure<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(error) => error.fmt(f),
            None => f.write_str("attempt timed out"),
        }
    }
}
