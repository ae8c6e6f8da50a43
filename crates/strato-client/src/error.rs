//! Error types for dispatch and polling.
//!
//! The taxonomy distinguishes four failure kinds with different handling:
//! transport errors (the exchange could not be completed), protocol errors
//! (non-2xx responses, never retried), job failures (the polled operation
//! reached an explicit failure status), and timeout-exhaustion (the
//! operation stayed pending through the whole retry budget). None of them
//! trigger remote-side cleanup; a mutating call that fails mid-flow can
//! leave a partially created resource behind, and cleanup is the caller's
//! responsibility.

use strato_auth::AuthError;
use strato_core::CoreError;
use thiserror::Error;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while dispatching requests or waiting on jobs.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP exchange itself could not be completed (DNS, connection,
    /// timeout at the HTTP layer).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a status outside `[200, 300)`. The raw
    /// body is kept so callers can log and diagnose.
    #[error("unexpected response status {status}: {body}")]
    Protocol {
        /// Numeric HTTP status.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The polled operation reached an explicit failure status.
    #[error("failed to {action} {task}: {message}")]
    JobFailed {
        /// The action being waited on (e.g., "create").
        action: String,
        /// The object of the action (e.g., "volume vol-1").
        task: String,
        /// Remote-supplied error text, possibly aggregated per sub-item.
        message: String,
    },

    /// The operation stayed pending through the entire retry budget.
    #[error("{action} {task} took too long")]
    Timeout {
        /// The action being waited on.
        action: String,
        /// The object of the action.
        task: String,
    },

    /// The wait was aborted through its cancellation token.
    #[error("wait for {action} {task} was cancelled")]
    Cancelled {
        /// The action being waited on.
        action: String,
        /// The object of the action.
        task: String,
    },

    /// A response body could not be decoded into the expected document.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    /// Host registry or other shared configuration error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Bearer-token acquisition failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl ClientError {
    /// Returns `true` for transport-level failures, the only kind an inner
    /// probe-retry policy is allowed to retry.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if the same call might succeed if issued again.
    ///
    /// Protocol errors and job failures are deterministic for a given
    /// request; transport errors and timeouts are not.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}
