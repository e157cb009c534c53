//! Error types for inbound message validation and parsing.

use super::MessageId;
use thiserror::Error;

/// Errors returned while constructing or mutating inbound messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageDomainError {
    /// The platform message identifier is blank or oversized.
    #[error("invalid platform message identifier: {0:?}")]
    InvalidPlatformMessageId(String),

    /// The message already carries a processing outcome.
    #[error("message {0} has already been processed")]
    AlreadyProcessed(MessageId),
}

/// Error returned while parsing intent types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown intent type: {0}")]
pub struct ParseIntentTypeError(pub String);
