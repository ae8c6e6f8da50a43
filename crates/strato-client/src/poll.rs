//! Completion waiting: the poll loop shared by every status vocabulary.
//!
//! All three wait variants (generic jobs, backup jobs, agent activation)
//! are instances of one loop: probe, classify into a
//! [`JobOutcome`](strato_core::JobOutcome), and either finish or sleep and
//! try again. The probe supplies the classification; this module supplies
//! the loop, the outer retry budget, the optional inner transport-retry
//! policy, and cancellation at every sleep point.
//!
//! # State machine
//!
//! ```text
//!               ┌──────────┐  probe
//!      ┌───────▶│ Pending  │─────────┬──────────────┐
//!      │ sleep  └────┬─────┘         │              │
//!      │             │ budget        ▼              ▼
//!      └─────────────┤ left     ┌─────────┐    ┌─────────┐
//!                    │          │ Success │    │ Failure │
//!                    ▼          └─────────┘    └─────────┘
//!               ┌──────────┐
//!               │ TimedOut │
//!               └──────────┘
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;

use strato_core::{HostTag, JobOutcome, OperationHandle, PollPolicy, TransportRetry};

use crate::dispatch::OutboundRequest;
use crate::error::{ClientError, Result};
use crate::session::Session;

/// Status document of a generic asynchronous operation.
#[derive(Debug, serde::Deserialize)]
struct OperationStatus {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    error: String,
}

/// Run one wait loop until the probe reports a terminal outcome, the
/// retry budget runs out, or the token is cancelled.
///
/// The probe is called once, then once more per retry while it keeps
/// reporting pending — `policy.retries == R` means at most `R + 1` probes.
/// A probe error is propagated immediately without consuming the outer
/// budget; only transport-class errors are retried, inside the probe
/// attempt itself, per `transport_retry`.
///
/// # Errors
///
/// - [`ClientError::JobFailed`] when the probe classifies a failure
/// - [`ClientError::Timeout`] when the budget is exhausted
/// - [`ClientError::Cancelled`] when the token fires during a sleep
/// - whatever the probe itself returns, after inner retries are spent
pub async fn wait_for<T, F, Fut>(
    action: &str,
    task: &str,
    mut probe: F,
    policy: PollPolicy,
    transport_retry: TransportRetry,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(JobOutcome, T)>>,
{
    let mut remaining = policy.retries;
    loop {
        let (outcome, detail) =
            probe_with_retry(&mut probe, transport_retry, action, task, cancel).await?;

        match outcome {
            JobOutcome::Success => {
                tracing::debug!(action, task, "Operation completed");
                return Ok(detail);
            }
            JobOutcome::Failure(message) => {
                tracing::warn!(action, task, error = %message, "Operation failed");
                return Err(ClientError::JobFailed {
                    action: action.to_string(),
                    task: task.to_string(),
                    message,
                });
            }
            JobOutcome::Pending => {
                if remaining == 0 {
                    tracing::warn!(action, task, "Retry budget exhausted");
                    return Err(ClientError::Timeout {
                        action: action.to_string(),
                        task: task.to_string(),
                    });
                }
                remaining -= 1;
                sleep_or_cancel(policy.interval, action, task, cancel).await?;
            }
        }
    }
}

/// One probe, with bounded retries of transport-level failures only.
async fn probe_with_retry<T, F, Fut>(
    probe: &mut F,
    retry: TransportRetry,
    action: &str,
    task: &str,
    cancel: &CancellationToken,
) -> Result<(JobOutcome, T)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(JobOutcome, T)>>,
{
    let mut attempt = 1;
    loop {
        match probe().await {
            Ok(result) => return Ok(result),
            Err(err) if err.is_transport() && attempt < retry.attempts => {
                tracing::warn!(action, task, attempt, error = %err, "Status probe failed, retrying");
                attempt += 1;
                sleep_or_cancel(retry.backoff, action, task, cancel).await?;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn sleep_or_cancel(
    interval: std::time::Duration,
    action: &str,
    task: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(ClientError::Cancelled {
            action: action.to_string(),
            task: task.to_string(),
        }),
        () = tokio::time::sleep(interval) => Ok(()),
    }
}

impl Session {
    /// Wait for a generic asynchronous operation to complete.
    ///
    /// Probes the operation's integer tri-state status on the management
    /// host until it reports success or failure, or the budget runs out.
    /// `action` and `task` name what is being waited on ("create",
    /// "volume vol-1") and appear in failure and timeout messages.
    ///
    /// # Errors
    ///
    /// See [`wait_for`]; probe transport failures propagate immediately
    /// unless `transport_retry` allows retries.
    pub async fn wait_on_completion(
        &self,
        operation_id: &str,
        action: &str,
        task: &str,
        policy: PollPolicy,
        transport_retry: TransportRetry,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = format!("/api/v1/operations/{operation_id}");
        wait_for(
            action,
            task,
            || {
                let path = path.clone();
                async move {
                    let response = self
                        .call(OutboundRequest::get(HostTag::Management, path))
                        .await?;
                    let doc: OperationStatus = response.json()?;
                    Ok((JobOutcome::from_tri_state(doc.status, &doc.error), ()))
                }
            },
            policy,
            transport_retry,
            cancel,
        )
        .await
    }

    /// Wait for any operation handle to reach a terminal state.
    ///
    /// Dispatches on the handle's shape to the matching poller. Backup
    /// jobs are waited without a sub-item name resolver and with their
    /// details discarded; call
    /// [`wait_on_backup_job`](Session::wait_on_backup_job) directly when
    /// either is needed.
    ///
    /// # Errors
    ///
    /// See the per-shape pollers; the terminal taxonomy is identical.
    pub async fn wait_until_done(
        &self,
        handle: &OperationHandle,
        policy: PollPolicy,
        transport_retry: TransportRetry,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match handle {
            OperationHandle::Operation {
                operation_id,
                action,
                task,
            } => {
                self.wait_on_completion(operation_id, action, task, policy, transport_retry, cancel)
                    .await
            }
            OperationHandle::BackupJob {
                job_id,
                working_environment_id,
            } => {
                self.wait_on_backup_job(
                    job_id,
                    working_environment_id,
                    policy,
                    transport_retry,
                    |_: &str| None,
                    cancel,
                )
                .await
                .map(|_| ())
            }
            OperationHandle::AgentActivation { desired_active } => {
                self.wait_for_agent_state(*desired_active, policy, transport_retry, cancel)
                    .await
            }
        }
    }
}
