//! Job payloads and their persisted state.

use super::{BackoffPolicy, ParseJobStatusError};
use crate::integration::domain::IntegrationId;
use crate::notification::domain::OutboundNotification;
use crate::webhook::{InboundEvent, MembershipEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a job identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit of work produced by the webhook handler or the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Job {
    /// Store, classify and synchronize an inbound chat message.
    ProcessMessage {
        /// Integration that received the webhook.
        integration_id: IntegrationId,
        /// Normalized message event.
        event: InboundEvent,
    },
    /// Apply a group membership change.
    SyncMembership {
        /// Integration that received the webhook.
        integration_id: IntegrationId,
        /// Normalized membership event.
        event: MembershipEvent,
    },
    /// Send an outbound notification.
    DispatchNotification(OutboundNotification),
}

impl Job {
    /// Returns the job kind stored alongside the payload.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ProcessMessage { .. } => "process_message",
            Self::SyncMembership { .. } => "sync_membership",
            Self::DispatchNotification(_) => "dispatch_notification",
        }
    }

    /// Returns the integration the job belongs to.
    #[must_use]
    pub const fn integration_id(&self) -> IntegrationId {
        match self {
            Self::ProcessMessage { integration_id, .. }
            | Self::SyncMembership { integration_id, .. } => *integration_id,
            Self::DispatchNotification(notification) => notification.integration_id,
        }
    }
}

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Waiting to be claimed once `available_at` passes.
    Pending,
    /// Claimed by a worker under a lease.
    Running,
    /// Handled successfully.
    Done,
    /// Attempt budget spent or discarded as unprocessable.
    Failed,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(ParseJobStatusError(other.to_owned())),
        }
    }
}

/// A job handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    /// Job identifier.
    pub id: JobId,
    /// Payload.
    pub job: Job,
    /// 1-based attempt number of this claim.
    pub attempt: u32,
}

impl ClaimedJob {
    /// Returns whether an earlier attempt of this job already ran.
    #[must_use]
    pub const fn is_retry(&self) -> bool {
        self.attempt > 1
    }
}

/// Snapshot of a stored job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Job identifier.
    pub id: JobId,
    /// Payload.
    pub job: Job,
    /// Current state.
    pub status: JobStatus,
    /// Claims made so far.
    pub attempts: u32,
    /// Earliest time the job may be claimed.
    pub available_at: DateTime<Utc>,
    /// Worker holding the lease, if running.
    pub locked_by: Option<String>,
    /// Error from the last failed attempt.
    pub last_error: Option<String>,
    /// Enqueue time.
    pub created_at: DateTime<Utc>,
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The job will be retried at `available_at`.
    Retrying {
        /// Attempt that failed.
        attempt: u32,
        /// Next claimable time.
        available_at: DateTime<Utc>,
    },
    /// The attempt budget is spent; the job is `failed`.
    Exhausted {
        /// Attempt that failed.
        attempt: u32,
    },
}

/// Lease, retry budget and backoff applied by queue adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// How long a claim stays exclusive before another worker may take over.
    pub lease: chrono::Duration,
    /// Claims allowed per job.
    pub max_attempts: u32,
    /// Delay between failed attempts.
    pub backoff: BackoffPolicy,
}

impl QueueSettings {
    /// Decides whether `attempt` failing leaves room for another try.
    #[must_use]
    pub fn disposition(&self, attempt: u32, now: DateTime<Utc>) -> FailureDisposition {
        if attempt >= self.max_attempts {
            FailureDisposition::Exhausted { attempt }
        } else {
            FailureDisposition::Retrying {
                attempt,
                available_at: now + self.backoff.chrono_delay_for(attempt),
            }
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            lease: chrono::Duration::seconds(60),
            max_attempts: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}
