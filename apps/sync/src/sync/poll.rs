//! Poll Loop: waits for a backend background job to reach a terminal status.
//!
//! Unlike the retry scheduler the delay is fixed and the stopping condition
//! comes from response content. Transport failures are transient except on
//! the final attempt (or when not retryable); `classify` decides whether a
//! successful response means continue, done, no data, or failed.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sync::retry::Retryable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 40,
            interval: Duration::from_secs(3),
        }
    }
}

/// What a single successful status response means.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep<T> {
    Continue,
    Done(T),
    /// The job reports success but nothing usable came back.
    NoData,
    Failed(Option<String>),
}

/// Closed set of user-facing failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Timeout,
    Error,
    NoData,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Error => "error",
            FailureReason::NoData => "no-data",
        }
    }

    /// Shown when the backend supplies no message of its own.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            FailureReason::Timeout => {
                "Resume parsing is taking longer than expected. Please try again."
            }
            FailureReason::Error => "Resume parsing failed. Please try again.",
            FailureReason::NoData => {
                "We could not extract any details from your resume. \
                 Please upload a different file and try again."
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("still not finished after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("{message}")]
    Failed { message: String },

    #[error("{message}")]
    NoData { message: String },

    #[error("status request failed: {0}")]
    Transport(E),

    #[error("polling superseded before completion")]
    Cancelled,
}

impl<E> PollError<E> {
    /// `None` for cancellation, which is never surfaced to users.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            PollError::Timeout { .. } => Some(FailureReason::Timeout),
            PollError::Failed { .. } | PollError::Transport(_) => Some(FailureReason::Error),
            PollError::NoData { .. } => Some(FailureReason::NoData),
            PollError::Cancelled => None,
        }
    }
}

/// Calls `fetch` at most `policy.max_attempts` times, `policy.interval` apart,
/// until `classify` reports a terminal step.
pub async fn poll_until_terminal<T, R, E, F, Fut, C>(
    policy: &PollPolicy,
    token: &CancellationToken,
    mut fetch: F,
    mut classify: C,
) -> Result<Polled<T>, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    C: FnMut(R) -> PollStep<T>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if token.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PollError::Cancelled),
            response = fetch(attempt) => response,
        };

        match response {
            Err(error) if attempt == max_attempts || !error.is_retryable() => {
                return Err(PollError::Transport(error));
            }
            Err(error) => {
                warn!(attempt, %error, "status request failed, will poll again");
            }
            Ok(response) => match classify(response) {
                PollStep::Continue => debug!(attempt, "job still running"),
                PollStep::Done(value) => {
                    if token.is_cancelled() {
                        return Err(PollError::Cancelled);
                    }
                    return Ok(Polled {
                        value,
                        attempts: attempt,
                    });
                }
                PollStep::NoData => {
                    return Err(PollError::NoData {
                        message: FailureReason::NoData.fallback_message().to_string(),
                    });
                }
                PollStep::Failed(message) => {
                    let message = message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| FailureReason::Error.fallback_message().to_string());
                    return Err(PollError::Failed { message });
                }
            },
        }

        if attempt < max_attempts {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    Err(PollError::Timeout {
        attempts: max_attempts,
    })
}
