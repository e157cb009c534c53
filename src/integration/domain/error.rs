//! Error types for integration domain validation and parsing.

use super::{IntegrationId, IntegrationStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating integrations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrationDomainError {
    /// The channel identifier is blank.
    #[error("channel id must not be empty")]
    EmptyChannelId,

    /// The channel secret is blank.
    #[error("channel secret must not be empty")]
    EmptyChannelSecret,

    /// Transitioning between two statuses is not permitted.
    #[error("invalid integration status transition for {integration_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Integration being transitioned.
        integration_id: IntegrationId,
        /// Current status.
        from: IntegrationStatus,
        /// Requested status.
        to: IntegrationStatus,
    },

    /// The quiet-hours time zone is not a known IANA name.
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
}

/// Error returned while parsing integration statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown integration status: {0}")]
pub struct ParseIntegrationStatusError(pub String);
