//! Inbound message aggregate recorded for every chat message event.
//!
//! A message is stored before classification so that every delivery leaves
//! an audit trail. Once a processing outcome is recorded the message is
//! immutable.

use super::{IntentType, MessageDomainError, MessageId, PlatformMessageId};
use crate::integration::domain::IntegrationId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Parameter object for recording a newly received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInboundMessage {
    /// Integration that received the webhook.
    pub integration_id: IntegrationId,
    /// Platform-assigned message identifier.
    pub platform_message_id: PlatformMessageId,
    /// Platform group or room the message was posted in.
    pub group_ref: Option<String>,
    /// Platform user who sent the message.
    pub sender_id: Option<String>,
    /// Message text; empty for non-text messages.
    pub text: String,
    /// Platform timestamp of the message.
    pub sent_at: DateTime<Utc>,
}

/// A chat message received through a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    id: MessageId,
    integration_id: IntegrationId,
    platform_message_id: PlatformMessageId,
    group_ref: Option<String>,
    sender_id: Option<String>,
    text: String,
    sent_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
    is_processed: bool,
    intent_type: Option<IntentType>,
    task_ref: Option<TaskId>,
    processing_attempts: u32,
    last_error: Option<String>,
    permanently_failed: bool,
}

/// Parameter object for reconstructing a persisted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedInboundMessage {
    /// Persisted message identifier.
    pub id: MessageId,
    /// Persisted integration.
    pub integration_id: IntegrationId,
    /// Persisted platform identifier.
    pub platform_message_id: PlatformMessageId,
    /// Persisted group reference.
    pub group_ref: Option<String>,
    /// Persisted sender.
    pub sender_id: Option<String>,
    /// Persisted text.
    pub text: String,
    /// Persisted platform timestamp.
    pub sent_at: DateTime<Utc>,
    /// Persisted receipt timestamp.
    pub received_at: DateTime<Utc>,
    /// Whether processing completed.
    pub is_processed: bool,
    /// Classified intent, once processed.
    pub intent_type: Option<IntentType>,
    /// Task created or completed by this message.
    pub task_ref: Option<TaskId>,
    /// Failed processing attempts so far.
    pub processing_attempts: u32,
    /// Most recent processing error.
    pub last_error: Option<String>,
    /// Whether retries have been exhausted.
    pub permanently_failed: bool,
}

impl InboundMessage {
    /// Records a newly received, unprocessed message.
    #[must_use]
    pub fn new(params: NewInboundMessage, clock: &impl Clock) -> Self {
        Self {
            id: MessageId::new(),
            integration_id: params.integration_id,
            platform_message_id: params.platform_message_id,
            group_ref: params.group_ref,
            sender_id: params.sender_id,
            text: params.text,
            sent_at: params.sent_at,
            received_at: clock.utc(),
            is_processed: false,
            intent_type: None,
            task_ref: None,
            processing_attempts: 0,
            last_error: None,
            permanently_failed: false,
        }
    }

    /// Reconstructs a message from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedInboundMessage) -> Self {
        Self {
            id: data.id,
            integration_id: data.integration_id,
            platform_message_id: data.platform_message_id,
            group_ref: data.group_ref,
            sender_id: data.sender_id,
            text: data.text,
            sent_at: data.sent_at,
            received_at: data.received_at,
            is_processed: data.is_processed,
            intent_type: data.intent_type,
            task_ref: data.task_ref,
            processing_attempts: data.processing_attempts,
            last_error: data.last_error,
            permanently_failed: data.permanently_failed,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the receiving integration.
    #[must_use]
    pub const fn integration_id(&self) -> IntegrationId {
        self.integration_id
    }

    /// Returns the platform identifier.
    #[must_use]
    pub const fn platform_message_id(&self) -> &PlatformMessageId {
        &self.platform_message_id
    }

    /// Returns the platform group or room reference.
    #[must_use]
    pub fn group_ref(&self) -> Option<&str> {
        self.group_ref.as_deref()
    }

    /// Returns the sender's platform user id.
    #[must_use]
    pub fn sender_id(&self) -> Option<&str> {
        self.sender_id.as_deref()
    }

    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the platform timestamp.
    #[must_use]
    pub const fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    /// Returns when tasklink stored the message.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns whether processing completed.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        self.is_processed
    }

    /// Returns the classified intent, once processed.
    #[must_use]
    pub const fn intent_type(&self) -> Option<IntentType> {
        self.intent_type
    }

    /// Returns the task this message created or completed.
    #[must_use]
    pub const fn task_ref(&self) -> Option<TaskId> {
        self.task_ref
    }

    /// Returns the number of failed processing attempts.
    #[must_use]
    pub const fn processing_attempts(&self) -> u32 {
        self.processing_attempts
    }

    /// Returns the most recent processing error.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns whether retries have been exhausted.
    #[must_use]
    pub const fn is_permanently_failed(&self) -> bool {
        self.permanently_failed
    }

    /// Returns whether a retry may pick the message up again.
    #[must_use]
    pub const fn is_resumable(&self) -> bool {
        !self.is_processed && !self.permanently_failed
    }

    /// Records the processing outcome and marks the message processed.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::AlreadyProcessed`] if an outcome was
    /// already recorded.
    pub fn record_outcome(
        &mut self,
        intent_type: IntentType,
        task_ref: Option<TaskId>,
    ) -> Result<(), MessageDomainError> {
        if self.is_processed {
            return Err(MessageDomainError::AlreadyProcessed(self.id));
        }
        self.is_processed = true;
        self.intent_type = Some(intent_type);
        self.task_ref = task_ref;
        self.last_error = None;
        Ok(())
    }

    /// Records a failed processing attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.processing_attempts = self.processing_attempts.saturating_add(1);
        self.last_error = Some(error.into());
    }

    /// Flags the message as needing manual inspection.
    pub const fn mark_permanently_failed(&mut self) {
        self.permanently_failed = true;
    }
}
