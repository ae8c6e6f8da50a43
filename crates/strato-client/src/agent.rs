//! Agent activation polling.
//!
//! The agent descriptor has no job id; the wait probes the agent's own
//! `status` field on the management host. The terminal condition depends
//! on direction: `"active"` when bringing the agent up, anything but
//! `"active"` when tearing it down. This vocabulary has no failure state —
//! a wait ends in success or timeout, and probe errors propagate.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use strato_core::{HostTag, JobOutcome, PollPolicy, TransportRetry};

use crate::dispatch::OutboundRequest;
use crate::error::Result;
use crate::session::Session;

/// An agent as reported by the management host.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentDescriptor {
    /// Free-text agent status; `"active"` is the up state.
    #[serde(default)]
    pub status: String,
    /// The agent's identifier.
    #[serde(rename = "agentId", default)]
    pub agent_id: String,
}

/// Wire envelope of the agent endpoint.
#[derive(Debug, Deserialize)]
struct AgentEnvelope {
    agent: AgentDescriptor,
}

impl Session {
    /// Wait until the session's agent reaches the desired activation state.
    ///
    /// With `desired_active == true` the wait ends when the agent reports
    /// `"active"`; with `false`, when it reports anything else.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Timeout`](crate::ClientError::Timeout) when the
    ///   agent does not reach the target state within the budget
    /// - [`ClientError::Cancelled`](crate::ClientError::Cancelled) when
    ///   the token fires during a sleep
    /// - probe errors, after `transport_retry` is spent
    pub async fn wait_for_agent_state(
        &self,
        desired_active: bool,
        policy: PollPolicy,
        transport_retry: TransportRetry,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let client_id = &self.config().client_id;
        let path = format!("/api/v1/agents/{client_id}");
        let action = if desired_active {
            "activate"
        } else {
            "deactivate"
        };
        let task = format!("agent {client_id}");

        crate::poll::wait_for(
            action,
            &task,
            || {
                let path = path.clone();
                async move {
                    let response = self
                        .call(OutboundRequest::get(HostTag::Management, path))
                        .await?;
                    let envelope: AgentEnvelope = response.json()?;
                    let outcome =
                        JobOutcome::from_agent_status(&envelope.agent.status, desired_active);
                    Ok((outcome, ()))
                }
            },
            policy,
            transport_retry,
            cancel,
        )
        .await
    }
}
