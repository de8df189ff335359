use thiserror::Error;

use crate::normalize::NormalizationError;
use crate::sync::poll::{FailureReason, PollError};
use crate::sync::retry::Retryable;

pub const ACCOUNT_SYNC_TIMEOUT_MESSAGE: &str =
    "Account setup is taking longer than expected. Please try again.";

/// Error type shared by every synchronization call site.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication rejected: {message}")]
    Auth { message: String },

    #[error("{message}")]
    Timeout { message: String },

    #[error("{message}")]
    NoData { message: String },

    #[error("{message}")]
    ParseFailed { message: String },

    #[error("Malformed backend payload: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("Superseded by a newer run")]
    Cancelled,
}

impl SyncError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Network(_) => "NETWORK_ERROR",
            SyncError::Api { .. } => "BACKEND_ERROR",
            SyncError::Auth { .. } => "AUTH_ERROR",
            SyncError::Timeout { .. } => "TIMEOUT",
            SyncError::NoData { .. } => "NO_DATA",
            SyncError::ParseFailed { .. } => "PARSE_FAILED",
            SyncError::Normalization(_) => "MALFORMED_PAYLOAD",
            SyncError::Cancelled => "CANCELLED",
        }
    }

    /// Whether the user should be offered a manual retry. Auth failures force
    /// re-authentication instead; cancelled runs are never shown.
    pub fn retry_available(&self) -> bool {
        !matches!(self, SyncError::Auth { .. } | SyncError::Cancelled)
    }

    pub fn requires_sign_out(&self) -> bool {
        matches!(self, SyncError::Auth { .. })
    }

    /// The classified reason reported for resume parsing failures.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            SyncError::Timeout { .. } => Some(FailureReason::Timeout),
            SyncError::NoData { .. } => Some(FailureReason::NoData),
            SyncError::Cancelled | SyncError::Auth { .. } => None,
            _ => Some(FailureReason::Error),
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Network(_) => {
                "We could not reach the server. Check your connection and try again.".to_string()
            }
            SyncError::Api { message, .. } if !message.is_empty() => message.clone(),
            SyncError::Api { .. } => "Something went wrong on our side. Please try again.".to_string(),
            SyncError::Auth { .. } => "Your session has expired. Please sign in again.".to_string(),
            SyncError::Timeout { message }
            | SyncError::NoData { message }
            | SyncError::ParseFailed { message } => message.clone(),
            SyncError::Normalization(_) => {
                "The server sent a response we could not read. Please try again.".to_string()
            }
            SyncError::Cancelled => String::new(),
        }
    }
}

impl Retryable for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) => true,
            SyncError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SyncError::Network(format!("request timed out: {e}"))
        } else {
            SyncError::Network(e.to_string())
        }
    }
}

impl From<PollError<SyncError>> for SyncError {
    fn from(e: PollError<SyncError>) -> Self {
        match e {
            PollError::Timeout { .. } => SyncError::Timeout {
                message: FailureReason::Timeout.fallback_message().to_string(),
            },
            PollError::Failed { message } => SyncError::ParseFailed { message },
            PollError::NoData { message } => SyncError::NoData { message },
            PollError::Transport(inner) => inner,
            PollError::Cancelled => SyncError::Cancelled,
        }
    }
}
