//! Error types for the queue domain.

use thiserror::Error;

/// Error returned when parsing a job status from storage fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);
