//! Request dispatch: one logical request in, one HTTP exchange out.
//!
//! The dispatcher resolves the request's host tag against the session's
//! registry, acquires a slot from the pool, attaches the bearer token when
//! one is held, and performs the exchange. It does not interpret the
//! response body beyond handing it back; callers classify non-2xx statuses
//! through [`ApiResponse::ok`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use strato_core::HostTag;

use crate::error::{ClientError, Result};
use crate::session::Session;

pub use reqwest::Method;

/// Response header carrying the correlation id of an asynchronously
/// executed operation.
pub const OPERATION_ID_HEADER: &str = "x-request-id";

/// A logical request to one of the backend hosts.
///
/// `params == None` means a body-less request (the usual shape for GET and
/// DELETE); `Some(Value)` — including `Some(json!({}))` — sends a JSON
/// body. The distinction is deliberate: some endpoints reject an empty
/// object where they expect no body at all.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Which backend host to route to.
    pub host: HostTag,
    /// Path (plus query string) relative to the host's base URL.
    pub path: String,
    /// JSON body, or `None` for a body-less request.
    pub params: Option<Value>,
    /// Bearer token to attach, if already held.
    pub token: Option<String>,
}

impl OutboundRequest {
    /// A request with no body and no token.
    #[must_use]
    pub fn new(method: Method, host: HostTag, path: impl Into<String>) -> Self {
        Self {
            method,
            host,
            path: path.into(),
            params: None,
            token: None,
        }
    }

    /// A body-less GET.
    #[must_use]
    pub fn get(host: HostTag, path: impl Into<String>) -> Self {
        Self::new(Method::GET, host, path)
    }

    /// A POST carrying the given JSON body.
    #[must_use]
    pub fn post(host: HostTag, path: impl Into<String>, params: Value) -> Self {
        Self::new(Method::POST, host, path).with_params(params)
    }

    /// A PUT carrying the given JSON body.
    #[must_use]
    pub fn put(host: HostTag, path: impl Into<String>, params: Value) -> Self {
        Self::new(Method::PUT, host, path).with_params(params)
    }

    /// A body-less DELETE.
    #[must_use]
    pub fn delete(host: HostTag, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, host, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Attach a bearer token explicitly.
    ///
    /// [`Session::call`] fills this in from the token manager when absent.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// The raw result of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Numeric HTTP status.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Correlation id of the remote operation, when the backend started
    /// one. Mutating endpoints that are polled afterwards carry it; read
    /// endpoints may not.
    pub operation_id: Option<String>,
}

impl ApiResponse {
    /// Classify the status: pass 2xx through, turn anything else into a
    /// protocol error embedding the status and raw body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] for statuses outside `[200, 300)`.
    pub fn ok(self) -> Result<Self> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(ClientError::Protocol {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] when the body does not
    /// decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

impl Session {
    /// Perform one HTTP exchange under the slot pool.
    ///
    /// Returns the raw status and body for the caller to classify; a
    /// completed exchange with a non-2xx status is `Ok` here. Only a
    /// failure to complete the exchange at all is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] for an unregistered host tag and
    /// [`ClientError::Transport`] when the exchange could not be completed.
    pub async fn execute(&self, request: OutboundRequest) -> Result<ApiResponse> {
        let runtime = self.runtime().await;
        let base = self.config().hosts.resolve(request.host)?;
        let url = format!("{base}{}", request.path);

        let _slot = runtime.slots.acquire().await;

        tracing::debug!(
            method = %request.method,
            host = %request.host,
            path = %request.path,
            "Dispatching request"
        );

        let mut builder = runtime.http.request(request.method.clone(), &url);
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(params) = &request.params {
            builder = builder.json(params);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let operation_id = response
            .headers()
            .get(OPERATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        tracing::debug!(status, operation_id = ?operation_id, "Request completed");

        Ok(ApiResponse {
            status,
            body,
            operation_id,
        })
    }

    /// Perform an authenticated exchange and classify the status.
    ///
    /// Fetches the bearer token (first use triggers the grant) unless the
    /// request already carries one, dispatches, and converts non-2xx
    /// responses into protocol errors.
    ///
    /// # Errors
    ///
    /// Everything [`Session::execute`] returns, plus
    /// [`ClientError::Auth`] when the token grant fails and
    /// [`ClientError::Protocol`] for non-2xx responses.
    pub async fn call(&self, mut request: OutboundRequest) -> Result<ApiResponse> {
        if request.token.is_none() {
            let runtime = self.runtime().await;
            request.token = Some(runtime.tokens.get_token().await?);
        }
        self.execute(request).await?.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    use crate::test_support::{mount_token, session_for};
    use strato_core::CoreError;

    /// Matches only requests with no body and no content-type header.
    struct NoBody;

    impl Match for NoBody {
        fn matches(&self, request: &Request) -> bool {
            request.body.is_empty() && !request.headers.contains_key("content-type")
        }
    }

    #[tokio::test]
    async fn get_with_no_params_sends_no_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/volumes"))
            .and(NoBody)
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let response = session
            .execute(OutboundRequest::get(HostTag::Management, "/api/v1/volumes"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "[]");
    }

    #[tokio::test]
    async fn explicit_empty_params_send_an_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/volumes"))
            .and(wiremock::matchers::body_json(json!({})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session
            .execute(OutboundRequest::post(
                HostTag::Management,
                "/api/v1/volumes",
                json!({}),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let server = MockServer::start().await;
        mount_token(&server, "bearer-abc").await;
        Mock::given(method("GET"))
            .and(path("/api/v1/volumes"))
            .and(header("authorization", "Bearer bearer-abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session
            .call(OutboundRequest::get(HostTag::Management, "/api/v1/volumes"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn operation_id_header_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(202).insert_header(OPERATION_ID_HEADER, "op-42"),
            )
            .mount(&server)
            .await;

        let session = session_for(&server);
        let response = session
            .execute(OutboundRequest::post(
                HostTag::Management,
                "/api/v1/volumes",
                json!({ "name": "v1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.operation_id.as_deref(), Some("op-42"));
    }

    #[tokio::test]
    async fn non_success_status_classifies_as_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(422).set_body_string("name taken"))
            .mount(&server)
            .await;

        let session = session_for(&server);
        // execute hands the raw exchange back
        let raw = session
            .execute(OutboundRequest::get(HostTag::Management, "/api/v1/volumes"))
            .await
            .unwrap();
        assert_eq!(raw.status, 422);

        // ok() classifies
        let err = raw.ok().unwrap_err();
        match err {
            ClientError::Protocol { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "name taken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_host_is_a_configuration_error() {
        let server = MockServer::start().await;
        let session = session_for(&server);
        // The test registry maps management/storage/auth only
        let err = session
            .execute(OutboundRequest::get(HostTag::GcpDeploy, "/deployments"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(CoreError::UnknownHost(HostTag::GcpDeploy))
        ));
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        // A bare (non-pooled) server: dropping it shuts the listener down,
        // unlike pooled servers which keep listening for reuse.
        let server = MockServer::builder().start().await;
        let session = session_for(&server);
        // Kill the server so the exchange cannot complete
        drop(server);

        let err = session
            .execute(OutboundRequest::get(HostTag::Management, "/api/v1/volumes"))
            .await
            .unwrap_err();
        assert!(err.is_transport(), "got {err:?}");
    }
}
