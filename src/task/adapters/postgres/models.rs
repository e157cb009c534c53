//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Owning festival.
    pub festival_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Lifecycle status.
    pub status: String,
    /// Whether the task was created from a chat message.
    pub created_via_messaging: bool,
    /// Linked chat messages.
    pub source_messages: Vec<uuid::Uuid>,
    /// Optional deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Owning festival.
    pub festival_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Lifecycle status.
    pub status: String,
    /// Whether the task was created from a chat message.
    pub created_via_messaging: bool,
    /// Linked chat messages.
    pub source_messages: Vec<uuid::Uuid>,
    /// Optional deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Changeset applied when a task is updated.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Linked chat messages.
    pub source_messages: Vec<uuid::Uuid>,
    /// Optional deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
