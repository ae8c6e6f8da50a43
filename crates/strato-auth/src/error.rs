//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while acquiring a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The HTTP exchange with the auth host could not be completed.
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The auth host rejected the grant.
    #[error("token grant rejected with status {status}: {body}")]
    GrantRejected {
        /// HTTP status of the rejection.
        status: u16,
        /// Raw response body, kept for diagnosis.
        body: String,
    },

    /// The auth host returned a body that did not contain a usable token.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Returns `true` if the grant might succeed on retry.
    ///
    /// Rejections are terminal: retrying the same refresh token against the
    /// same client id will not produce a different answer.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
