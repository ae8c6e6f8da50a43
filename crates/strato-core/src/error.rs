//! Common error types for the strato client.

use crate::hosts::HostTag;
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared across the strato crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No base URL is registered for the requested host tag.
    ///
    /// This is a configuration error, not a runtime condition: a request
    /// routed at an unregistered host can never succeed.
    #[error("no base URL registered for host {0}")]
    UnknownHost(HostTag),

    /// A base URL override was rejected.
    #[error("invalid base URL for host {tag}: {reason}")]
    InvalidBaseUrl {
        /// The host the override was meant for.
        tag: HostTag,
        /// Why the URL was rejected.
        reason: String,
    },
}
