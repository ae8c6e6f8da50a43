//! Token manager: cached, single-flight bearer-token acquisition.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// OAuth refresh-token grant request body.
#[derive(Debug, Serialize)]
struct GrantRequest<'a> {
    audience: &'a str,
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
}

/// Raw response from the token endpoint.
#[derive(Debug, Deserialize)]
struct GrantResponse {
    access_token: String,
}

/// Obtains and caches the session's bearer token.
///
/// The cache is if-absent: once a token has been fetched it is returned for
/// every subsequent call without re-validation. The fetch itself is
/// single-flight — the cache lock is held across the grant, so concurrent
/// first callers wait for one network exchange instead of issuing
/// duplicate grants.
pub struct TokenManager {
    config: AuthConfig,
    client: reqwest::Client,
    cached: Mutex<Option<String>>,
}

impl TokenManager {
    /// Create a token manager with its own HTTP client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen
    /// with default TLS).
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self::with_client(client, config)
    }

    /// Create a token manager reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: AuthConfig) -> Self {
        Self {
            config,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached bearer token, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant request fails at the transport level,
    /// is rejected by the auth host, or yields an unparsable body.
    pub async fn get_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Whether a token is currently cached. Does not trigger a fetch.
    pub async fn has_token(&self) -> bool {
        self.cached.lock().await.is_some()
    }

    async fn fetch_token(&self) -> Result<String> {
        let url = self.config.token_url();
        tracing::debug!(url = %url, client_id = %self.config.client_id, "Fetching bearer token");

        let request = GrantRequest {
            audience: &self.config.audience,
            grant_type: "refresh_token",
            refresh_token: &self.config.refresh_token,
            client_id: &self.config.client_id,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Token grant rejected");
            return Err(AuthError::GrantRejected {
                status: status.as_u16(),
                body,
            });
        }

        let grant: GrantResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if grant.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "empty access_token in grant response".to_string(),
            ));
        }

        Ok(grant.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AuthConfig {
        AuthConfig {
            base_url: server.uri(),
            audience: "https://api.strato.cloud".to_string(),
            client_id: "client-abc".to_string(),
            refresh_token: "rt-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn fetches_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_partial_json(json!({
                "audience": "https://api.strato.cloud",
                "grant_type": "refresh_token",
                "refresh_token": "rt-secret",
                "client_id": "client-abc",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "bearer-123",
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = TokenManager::new(config_for(&server));
        assert!(!tokens.has_token().await);

        let first = tokens.get_token().await.unwrap();
        assert_eq!(first, "bearer-123");
        assert!(tokens.has_token().await);

        // Second call is served from cache; the mock's expect(1) verifies
        // no second grant was issued.
        let second = tokens.get_token().await.unwrap();
        assert_eq!(second, "bearer-123");
    }

    #[tokio::test]
    async fn concurrent_first_use_is_single_flight() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "bearer-sf" }))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(TokenManager::new(config_for(&server)));

        let a = tokio::spawn({
            let tokens = Arc::clone(&tokens);
            async move { tokens.get_token().await.unwrap() }
        });
        let b = tokio::spawn({
            let tokens = Arc::clone(&tokens);
            async move { tokens.get_token().await.unwrap() }
        });

        assert_eq!(a.await.unwrap(), "bearer-sf");
        assert_eq!(b.await.unwrap(), "bearer-sf");
    }

    #[tokio::test]
    async fn rejection_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(403).set_body_string("grant denied"))
            .mount(&server)
            .await;

        let tokens = TokenManager::new(config_for(&server));
        let err = tokens.get_token().await.unwrap_err();
        match err {
            AuthError::GrantRejected { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "grant denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // A rejected grant must not poison the cache
        assert!(!tokens.has_token().await);
    }

    #[tokio::test]
    async fn empty_access_token_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "" })),
            )
            .mount(&server)
            .await;

        let tokens = TokenManager::new(config_for(&server));
        let err = tokens.get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }
}
