//! Diesel row models for inbound message persistence.

use super::schema::messages;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result and insert row for inbound messages.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Internal message identifier.
    pub id: uuid::Uuid,
    /// Receiving integration.
    pub integration_id: uuid::Uuid,
    /// Platform-assigned message identifier.
    pub platform_message_id: String,
    /// Platform group or room identifier.
    pub group_ref: Option<String>,
    /// Platform sender identifier.
    pub sender_id: Option<String>,
    /// Message text.
    pub text: String,
    /// Platform timestamp.
    pub sent_at: DateTime<Utc>,
    /// Receipt timestamp.
    pub received_at: DateTime<Utc>,
    /// Whether processing completed.
    pub is_processed: bool,
    /// Classified intent.
    pub intent_type: Option<String>,
    /// Created or completed task.
    pub task_ref: Option<uuid::Uuid>,
    /// Failed processing attempts.
    pub processing_attempts: i32,
    /// Most recent processing error.
    pub last_error: Option<String>,
    /// Whether retries have been exhausted.
    pub permanently_failed: bool,
}

/// Processing-state changeset.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = messages)]
#[diesel(treat_none_as_null = true)]
pub struct MessageProcessingChangeset {
    /// Whether processing completed.
    pub is_processed: bool,
    /// Classified intent.
    pub intent_type: Option<String>,
    /// Created or completed task.
    pub task_ref: Option<uuid::Uuid>,
    /// Failed processing attempts.
    pub processing_attempts: i32,
    /// Most recent processing error.
    pub last_error: Option<String>,
    /// Whether retries have been exhausted.
    pub permanently_failed: bool,
}
