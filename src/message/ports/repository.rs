//! Repository port for inbound message persistence.
//!
//! Implementations must enforce uniqueness of
//! `(integration_id, platform_message_id)` atomically; callers rely on
//! [`InsertOutcome::AlreadyExists`] rather than a prior lookup.

use crate::integration::domain::IntegrationId;
use crate::message::domain::{InboundMessage, MessageId, PlatformMessageId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for message repository operations.
pub type MessageRepositoryResult<T> = Result<T, MessageRepositoryError>;

/// Outcome of an idempotent insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The message was stored for the first time.
    Inserted,
    /// A message with the same platform identifier was already stored.
    AlreadyExists(InboundMessage),
}

/// Port for inbound message persistence.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Stores a message unless its platform identifier is already known.
    ///
    /// # Errors
    ///
    /// Returns [`MessageRepositoryError::Persistence`] when storage fails.
    async fn insert_new(&self, message: &InboundMessage) -> MessageRepositoryResult<InsertOutcome>;

    /// Persists processing state (outcome, attempts, failure flags).
    ///
    /// # Errors
    ///
    /// Returns [`MessageRepositoryError::NotFound`] when the message does not
    /// exist.
    async fn update(&self, message: &InboundMessage) -> MessageRepositoryResult<()>;

    /// Retrieves a message by internal identifier.
    async fn find_by_id(&self, id: MessageId) -> MessageRepositoryResult<Option<InboundMessage>>;

    /// Retrieves a message by its platform identifier.
    async fn find_by_platform_id(
        &self,
        integration_id: IntegrationId,
        platform_message_id: &PlatformMessageId,
    ) -> MessageRepositoryResult<Option<InboundMessage>>;

    /// Lists permanently failed messages of an integration, oldest first.
    async fn list_failed(
        &self,
        integration_id: IntegrationId,
    ) -> MessageRepositoryResult<Vec<InboundMessage>>;
}

/// Errors returned by message repository implementations.
#[derive(Debug, Clone, Error)]
pub enum MessageRepositoryError {
    /// The message was not found.
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl MessageRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
