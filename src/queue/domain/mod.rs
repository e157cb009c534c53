//! Job payloads, job state and retry policy.

mod backoff;
mod error;
mod job;

pub use backoff::BackoffPolicy;
pub use error::ParseJobStatusError;
pub use job::{ClaimedJob, FailureDisposition, Job, JobId, JobRecord, JobStatus, QueueSettings};
