//! In-memory message repository for tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::integration::domain::IntegrationId;
use crate::message::{
    domain::{InboundMessage, MessageId, PlatformMessageId},
    ports::{InsertOutcome, MessageRepository, MessageRepositoryError, MessageRepositoryResult},
};

/// Thread-safe in-memory message repository.
///
/// The platform-identifier index is checked and updated under one write
/// lock, mirroring the unique constraint of the relational schema.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageRepository {
    state: Arc<RwLock<InMemoryMessageState>>,
}

#[derive(Debug, Default)]
struct InMemoryMessageState {
    messages: HashMap<MessageId, InboundMessage>,
    platform_index: HashMap<(IntegrationId, PlatformMessageId), MessageId>,
}

impl InMemoryMessageRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages.
    ///
    /// # Errors
    ///
    /// Returns [`MessageRepositoryError::Persistence`] when the lock is
    /// poisoned.
    pub fn len(&self) -> MessageRepositoryResult<usize> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.messages.len())
    }

    /// Returns whether no message has been stored.
    ///
    /// # Errors
    ///
    /// Returns [`MessageRepositoryError::Persistence`] when the lock is
    /// poisoned.
    pub fn is_empty(&self) -> MessageRepositoryResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> MessageRepositoryError {
    MessageRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert_new(&self, message: &InboundMessage) -> MessageRepositoryResult<InsertOutcome> {
        let mut state = self.state.write().map_err(poisoned)?;
        let key = (
            message.integration_id(),
            message.platform_message_id().clone(),
        );
        if let Some(existing_id) = state.platform_index.get(&key) {
            let existing = state
                .messages
                .get(existing_id)
                .cloned()
                .ok_or(MessageRepositoryError::NotFound(*existing_id))?;
            return Ok(InsertOutcome::AlreadyExists(existing));
        }
        state.platform_index.insert(key, message.id());
        state.messages.insert(message.id(), message.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update(&self, message: &InboundMessage) -> MessageRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let Some(stored) = state.messages.get_mut(&message.id()) else {
            return Err(MessageRepositoryError::NotFound(message.id()));
        };
        *stored = message.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> MessageRepositoryResult<Option<InboundMessage>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.messages.get(&id).cloned())
    }

    async fn find_by_platform_id(
        &self,
        integration_id: IntegrationId,
        platform_message_id: &PlatformMessageId,
    ) -> MessageRepositoryResult<Option<InboundMessage>> {
        let state = self.state.read().map_err(poisoned)?;
        let key = (integration_id, platform_message_id.clone());
        Ok(state
            .platform_index
            .get(&key)
            .and_then(|id| state.messages.get(id))
            .cloned())
    }

    async fn list_failed(
        &self,
        integration_id: IntegrationId,
    ) -> MessageRepositoryResult<Vec<InboundMessage>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut failed: Vec<InboundMessage> = state
            .messages
            .values()
            .filter(|message| {
                message.integration_id() == integration_id && message.is_permanently_failed()
            })
            .cloned()
            .collect();
        failed.sort_by_key(|message| (message.received_at(), message.id()));
        Ok(failed)
    }
}
