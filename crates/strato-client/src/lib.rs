//! Request dispatch and asynchronous job orchestration for the strato
//! control plane.
//!
//! This crate is the client-side core: it routes logical requests to the
//! right backend host under a bounded-concurrency slot pool, and waits on
//! asynchronously executed remote operations until they reach a terminal
//! state. Three status vocabularies are reconciled into one poll loop.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐      ┌──────────────────┐
//! │  resource layer    │─────▶│     Session      │
//! │  (external caller) │      │ config + runtime │
//! └────────────────────┘      └────────┬─────────┘
//!                                      │
//!                   ┌──────────────────┼───────────────────┐
//!                   ▼                  ▼                   ▼
//!           ┌──────────────┐   ┌──────────────┐   ┌────────────────┐
//!           │  SlotPool    │   │ TokenManager │   │  HostRegistry  │
//!           │ (≤ N in      │   │ (single-     │   │ (tag → base    │
//!           │  flight)     │   │  flight)     │   │  URL)          │
//!           └──────┬───────┘   └──────┬───────┘   └───────┬────────┘
//!                  └───────────┬──────┴────────────┬──────┘
//!                              ▼                   │ HTTPS
//!                      ┌──────────────┐            ▼
//!                      │   wait_for   │   management / auth /
//!                      │ (poll core)  │   storage / deploy hosts
//!                      └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use strato_auth::AuthConfig;
//! use strato_client::{OutboundRequest, Session, SessionConfig};
//! use strato_core::{HostTag, PollPolicy, TransportRetry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), strato_client::ClientError> {
//! let auth = AuthConfig {
//!     client_id: "client-abc".to_string(),
//!     refresh_token: "rt-secret".to_string(),
//!     ..AuthConfig::default()
//! };
//! let session = Session::new(SessionConfig::new("acct-1", "client-abc", auth));
//!
//! // Kick off a mutating call, then wait for the remote operation.
//! let response = session
//!     .call(OutboundRequest::post(
//!         HostTag::Management,
//!         "/api/v1/volumes",
//!         serde_json::json!({ "name": "v1", "size": 100 }),
//!     ))
//!     .await?;
//!
//! if let Some(operation_id) = response.operation_id {
//!     session
//!         .wait_on_completion(
//!             &operation_id,
//!             "create",
//!             "volume v1",
//!             PollPolicy::new(60, Duration::from_secs(10)),
//!             TransportRetry::none(),
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agent;
pub mod backup;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod session;

pub use agent::AgentDescriptor;
pub use backup::{BackupJob, BackupJobData, SubItemResult};
pub use dispatch::{ApiResponse, Method, OutboundRequest, OPERATION_ID_HEADER};
pub use error::{ClientError, Result};
pub use poll::wait_for;
pub use session::{Session, SessionConfig, SlotPool, DEFAULT_SLOT_CAPACITY};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use strato_auth::AuthConfig;
    use strato_core::{HostRegistry, HostTag};

    use crate::session::{Session, SessionConfig};

    /// A session whose management, storage and auth hosts all point at the
    /// given mock server.
    pub(crate) fn session_for(server: &MockServer) -> Session {
        let auth = AuthConfig {
            base_url: server.uri(),
            audience: "https://api.strato.cloud".to_string(),
            client_id: "client-1".to_string(),
            refresh_token: "rt-secret".to_string(),
        };
        let hosts = HostRegistry::empty()
            .with_host(HostTag::Management, server.uri())
            .with_host(HostTag::StorageService, server.uri())
            .with_host(HostTag::Auth, server.uri());
        Session::new(SessionConfig::new("acct-1", "client-1", auth).with_hosts(hosts))
    }

    /// Mount a token-grant endpoint issuing the given bearer token.
    pub(crate) async fn mount_token(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": token })),
            )
            .mount(server)
            .await;
    }

    /// Replays a fixed sequence of responses, repeating the last one.
    pub(crate) struct SequenceResponder {
        responses: Vec<ResponseTemplate>,
        hits: AtomicUsize,
    }

    impl SequenceResponder {
        pub(crate) fn new(responses: Vec<ResponseTemplate>) -> Self {
            assert!(!responses.is_empty());
            Self {
                responses,
                hits: AtomicUsize::new(0),
            }
        }
    }

    impl Respond for SequenceResponder {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            let n = self.hits.fetch_add(1, Ordering::SeqCst);
            self.responses[n.min(self.responses.len() - 1)].clone()
        }
    }
}
