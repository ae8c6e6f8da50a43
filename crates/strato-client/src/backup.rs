//! Backup-job polling against the storage service.
//!
//! Backup jobs speak the string status vocabulary (`"FAILED"`,
//! `"COMPLETED"`, anything else pending) and can carry per-volume sub-item
//! results. On terminal failure the error message aggregates every failed
//! sub-item, resolving volume ids to names through a caller-supplied
//! lookup; when no sub-item detail exists the top-level job error is used.
//!
//! The storage service sits behind a less reliable network path than the
//! management host, so probes here are usually run with
//! [`TransportRetry::standard`] (three attempts, one second apart).

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use strato_core::{HostTag, JobOutcome, PollPolicy, TransportRetry};

use crate::dispatch::OutboundRequest;
use crate::error::{ClientError, Result};
use crate::session::Session;

/// A backup job's status document.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupJob {
    /// Job identifier.
    #[serde(default)]
    pub id: String,
    /// The working environment the job targets.
    #[serde(rename = "working-environment-id", default)]
    pub working_environment_id: String,
    /// Job type (e.g., "backup", "restore").
    #[serde(rename = "type", default)]
    pub job_type: String,
    /// `"FAILED"`, `"COMPLETED"`, or any in-progress value.
    #[serde(default)]
    pub status: String,
    /// Top-level error text, populated on failure.
    #[serde(default)]
    pub error: String,
    /// Job timestamp, epoch milliseconds.
    #[serde(default)]
    pub time: i64,
    /// Per-sub-item results, when the job tracks them.
    #[serde(default)]
    pub data: BackupJobData,
}

/// The per-sub-item section of a backup job document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupJobData {
    /// One entry per volume covered by the job.
    #[serde(default)]
    pub volumes: Vec<SubItemResult>,
}

/// Outcome of one sub-item (e.g., one volume) within a backup job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubItemResult {
    /// Sub-item identifier, resolvable to a display name by the caller.
    #[serde(default)]
    pub id: String,
    /// The sub-item's own status; `"FAILED"` marks it failed.
    #[serde(default)]
    pub status: String,
    /// The sub-item's own error text.
    #[serde(default)]
    pub error: String,
}

/// Wire envelope of the job status endpoint.
#[derive(Debug, Deserialize)]
struct JobEnvelope {
    #[serde(default)]
    job: Vec<BackupJob>,
}

/// Build the failure message for a failed job.
///
/// Aggregates every failed sub-item as `name: error`, prefixed with the
/// failed count; falls back to the job's top-level error when there is no
/// sub-item detail.
fn failure_message<F>(job: &BackupJob, resolve_name: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let failed: Vec<&SubItemResult> = job
        .data
        .volumes
        .iter()
        .filter(|item| item.status == "FAILED")
        .collect();

    if failed.is_empty() {
        if job.error.is_empty() {
            return "job reported failure with no error detail".to_string();
        }
        return job.error.clone();
    }

    let details: Vec<String> = failed
        .iter()
        .map(|item| {
            let name = resolve_name(&item.id).unwrap_or_else(|| item.id.clone());
            format!("{name}: {}", item.error)
        })
        .collect();

    format!(
        "{} of {} volumes failed: {}",
        failed.len(),
        job.data.volumes.len(),
        details.join("; ")
    )
}

fn classify<F>(job: &BackupJob, resolve_name: &F) -> JobOutcome
where
    F: Fn(&str) -> Option<String>,
{
    match job.status.as_str() {
        "FAILED" => JobOutcome::from_backup_status("FAILED", &failure_message(job, resolve_name)),
        other => JobOutcome::from_backup_status(other, ""),
    }
}

impl Session {
    /// Wait for a backup job to complete, returning its final details.
    ///
    /// The job is scoped to the session's account and the given working
    /// environment. `resolve_name` maps sub-item ids to display names for
    /// the aggregated failure message; returning `None` keeps the raw id.
    ///
    /// # Errors
    ///
    /// - [`ClientError::JobFailed`] with the aggregated sub-item detail
    ///   (or the top-level job error) when the job reports `"FAILED"`
    /// - [`ClientError::Timeout`] when the budget is exhausted
    /// - [`ClientError::InvalidResponse`] when the endpoint answers with
    ///   no job document
    /// - probe transport failures, after `transport_retry` is spent
    pub async fn wait_on_backup_job<F>(
        &self,
        job_id: &str,
        working_environment_id: &str,
        policy: PollPolicy,
        transport_retry: TransportRetry,
        resolve_name: F,
        cancel: &CancellationToken,
    ) -> Result<BackupJob>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = format!(
            "/v1/accounts/{}/working-environments/{working_environment_id}/jobs/{job_id}",
            self.config().account_id
        );
        let task = format!("job {job_id}");

        crate::poll::wait_for(
            "back up",
            &task,
            || {
                let path = path.clone();
                let resolve_name = &resolve_name;
                async move {
                    let response = self
                        .call(OutboundRequest::get(HostTag::StorageService, path))
                        .await?;
                    let envelope: JobEnvelope = response.json()?;
                    let job = envelope.job.into_iter().next().ok_or_else(|| {
                        ClientError::InvalidResponse(
                            "job status document contained no entries".to_string(),
                        )
                    })?;
                    let outcome = classify(&job, resolve_name);
                    Ok((outcome, job))
                }
            },
            policy,
            transport_retry,
            cancel,
        )
        .await
    }
}
