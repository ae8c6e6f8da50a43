//! Job outcome classification and poll policies.
//!
//! The backends speak three incompatible status vocabularies: an integer
//! tri-state for generic jobs, string statuses for backup jobs, and a
//! free-text agent status whose terminal condition depends on the direction
//! of the lifecycle change. [`JobOutcome`] is the single union every poller
//! operates on; one adapter per vocabulary translates the native encoding.
//!
//! # Classification
//!
//! ```text
//!  generic job        backup job           agent descriptor
//!  status: -1|0|1     status: string       status: string, desired: bool
//!       │                  │                     │
//!       ▼                  ▼                     ▼
//!  from_tri_state     from_backup_status    from_agent_status
//!       └─────────────────┬┴─────────────────────┘
//!                         ▼
//!          JobOutcome::{Pending, Success, Failure}
//! ```

use std::time::Duration;

/// The identifier a mutating call hands back for completion polling.
///
/// Three shapes exist, one per status vocabulary; each selects the poller
/// that understands its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationHandle {
    /// A generic job keyed by the request's correlation id; polled on the
    /// management host with the integer tri-state vocabulary.
    Operation {
        /// The correlation id returned by the mutating call.
        operation_id: String,
        /// The action being performed, for error messages (e.g., "create").
        action: String,
        /// The object of the action (e.g., "volume vol-1").
        task: String,
    },
    /// A backup job scoped to `(account, working environment)`; polled on
    /// the storage service with the string vocabulary.
    BackupJob {
        /// Job identifier.
        job_id: String,
        /// The working environment the job targets.
        working_environment_id: String,
    },
    /// An agent activation; no explicit id — the session's agent is polled
    /// until its status reaches (or leaves) `"active"`.
    AgentActivation {
        /// `true` when bringing the agent up, `false` when tearing down.
        desired_active: bool,
    },
}

/// The common classification of a polled operation's status.
///
/// `Pending` is the only non-terminal variant; a poller keeps probing until
/// it sees `Success` or `Failure`, or exhausts its retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The operation has not reached a terminal state yet.
    Pending,
    /// The operation completed successfully.
    Success,
    /// The operation failed; the payload is the remote-supplied error text.
    Failure(String),
}

impl JobOutcome {
    /// Classify a generic job's integer tri-state status.
    ///
    /// `1` is success and `-1` is failure; everything else (including
    /// status values this client does not know about) is treated as
    /// pending, so a new intermediate status introduced server-side
    /// degrades to more polling rather than a spurious terminal state.
    #[must_use]
    pub fn from_tri_state(status: i64, error: &str) -> Self {
        match status {
            1 => JobOutcome::Success,
            -1 => {
                let msg = if error.is_empty() {
                    "job reported failure with no error detail".to_string()
                } else {
                    error.to_string()
                };
                JobOutcome::Failure(msg)
            }
            _ => JobOutcome::Pending,
        }
    }

    /// Classify a backup job's string status.
    ///
    /// `"FAILED"` is terminal failure, `"COMPLETED"` is terminal success,
    /// and anything else is pending. `error` is the failure detail to carry
    /// when the status is `"FAILED"` (callers that aggregate per-sub-item
    /// results pass the composite message here).
    #[must_use]
    pub fn from_backup_status(status: &str, error: &str) -> Self {
        match status {
            "FAILED" => JobOutcome::Failure(error.to_string()),
            "COMPLETED" => JobOutcome::Success,
            _ => JobOutcome::Pending,
        }
    }

    /// Classify an agent descriptor's status against the desired direction.
    ///
    /// When bringing an agent up (`desired_active == true`) the terminal
    /// condition is `status == "active"`; when tearing it down it is
    /// `status != "active"`. There is no failure state for this
    /// vocabulary, only success-by-reaching-target or pending.
    #[must_use]
    pub fn from_agent_status(status: &str, desired_active: bool) -> Self {
        let active = status == "active";
        if active == desired_active {
            JobOutcome::Success
        } else {
            JobOutcome::Pending
        }
    }

    /// Returns `true` for `Success` and `Failure`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::Pending)
    }
}

/// The outer retry budget of a wait loop.
///
/// A policy of `retries = R` allows `R + 1` status probes in total: the
/// initial probe plus one per retry. Policies are consumed per call and not
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// How many times the poller may sleep and probe again after the
    /// initial probe comes back pending.
    pub retries: u32,
    /// How long to sleep between probes.
    pub interval: Duration,
}

impl PollPolicy {
    /// Create a policy allowing `retries` re-probes at the given interval.
    #[must_use]
    pub const fn new(retries: u32, interval: Duration) -> Self {
        Self { retries, interval }
    }
}

/// The inner retry policy applied to transport-level failures of a single
/// status probe.
///
/// Protocol errors (non-2xx responses) are never retried by this policy;
/// it only covers failures where the HTTP exchange itself could not be
/// completed. The default is [`TransportRetry::none`], which propagates a
/// transport failure immediately without consuming the outer budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRetry {
    /// Total probe attempts allowed, including the first.
    pub attempts: u32,
    /// Fixed backoff between attempts.
    pub backoff: Duration,
}

impl TransportRetry {
    /// No inner retry: a single attempt, transport failures propagate.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// The standard inner policy for probes against the storage service:
    /// three attempts with a one-second fixed backoff.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }

    /// Create a policy with the given attempt count and fixed backoff.
    ///
    /// An attempt count of zero is treated as one: the probe always runs
    /// at least once.
    #[must_use]
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        let attempts = if attempts == 0 { 1 } else { attempts };
        Self { attempts, backoff }
    }
}

impl Default for TransportRetry {
    fn default() -> Self {
        Self::none()
    }
}
