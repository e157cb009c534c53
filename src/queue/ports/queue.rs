//! Work queue port.

use crate::queue::domain::{ClaimedJob, FailureDisposition, Job, JobId, JobRecord, JobStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Durable job queue contract.
///
/// Claims are exclusive while their lease holds. Completing or failing a
/// job the caller no longer holds is reported as [`QueueError::NotFound`].
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a job that is immediately claimable.
    async fn enqueue(&self, job: &Job) -> QueueResult<JobId>;

    /// Claims the oldest claimable job for `worker_id`.
    ///
    /// Pending jobs whose `available_at` has passed and running jobs whose
    /// lease expired are claimable while attempts remain. Each claim counts
    /// as one attempt.
    async fn claim(&self, worker_id: &str) -> QueueResult<Option<ClaimedJob>>;

    /// Fails running jobs whose lease expired on their final attempt and
    /// returns them.
    ///
    /// Such jobs can never be claimed again; reaping is the only way their
    /// handler learns the queue gave up on them.
    async fn reap_expired(&self) -> QueueResult<Vec<JobRecord>>;

    /// Marks a claimed job as done.
    async fn complete(&self, id: JobId) -> QueueResult<()>;

    /// Records a failed attempt and schedules a retry or gives up.
    async fn fail(&self, id: JobId, error: &str) -> QueueResult<FailureDisposition>;

    /// Marks a claimed job as failed without further retries.
    async fn discard(&self, id: JobId, error: &str) -> QueueResult<()>;

    /// Loads a job snapshot.
    async fn find(&self, id: JobId) -> QueueResult<Option<JobRecord>>;

    /// Lists jobs in `status`, oldest first.
    async fn list_by_status(&self, status: JobStatus) -> QueueResult<Vec<JobRecord>>;
}

/// Errors returned by queue adapters.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The job does not exist.
    #[error("job {0} not found")]
    NotFound(JobId),
    /// A stored payload could not be decoded.
    #[error("job {id} has an unreadable payload: {message}")]
    InvalidPayload {
        /// Affected job.
        id: JobId,
        /// Decoder message.
        message: String,
    },
    /// Persistence failure.
    #[error("queue persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
