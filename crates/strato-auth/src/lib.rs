//! Bearer-token acquisition for the strato control-plane client.
//!
//! This crate obtains and caches the bearer token used to authenticate
//! against the management and storage hosts. Tokens are acquired with an
//! OAuth refresh-token grant against the auth host and cached for the life
//! of the session:
//!
//! - the fetch is **if-absent**, not time-based — a cached token is never
//!   re-validated or refreshed;
//! - first-use acquisition is **single-flight** — concurrent first callers
//!   await one grant instead of racing to issue duplicates.
//!
//! # Example
//!
//! ```no_run
//! use strato_auth::{AuthConfig, TokenManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig {
//!     base_url: "https://auth.strato.cloud".to_string(),
//!     audience: "https://api.strato.cloud".to_string(),
//!     client_id: "client-abc".to_string(),
//!     refresh_token: "rt-secret".to_string(),
//! };
//!
//! let tokens = TokenManager::new(config);
//! let bearer = tokens.get_token().await?;
//! # let _ = bearer;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod token;

pub use error::{AuthError, Result};
pub use token::TokenManager;

/// Configuration for token acquisition against the auth host.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the auth host (e.g., `https://auth.strato.cloud`).
    pub base_url: String,
    /// The audience the issued token is valid for.
    pub audience: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// The long-lived refresh token exchanged for bearer tokens.
    pub refresh_token: String,
}

impl AuthConfig {
    /// The token-grant endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "https://auth.strato.cloud".to_string(),
            audience: "https://api.strato.cloud".to_string(),
            client_id: String::new(),
            refresh_token: String::new(),
        }
    }
}
