//! Task aggregate root and related task lifecycle types.

use super::{FestivalId, ParseTaskStatusError, TaskDomainError, TaskId, TaskTitle};
use crate::message::domain::MessageId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been created but work has not started.
    Pending,
    /// Task is being worked on.
    InProgress,
    /// Task has been completed.
    Completed,
    /// Task has been abandoned.
    Cancelled,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the task still counts as open work.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::InProgress | Self::Completed | Self::Cancelled
            ) | (
                Self::InProgress,
                Self::Pending | Self::Completed | Self::Cancelled
            )
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Festival that owns the task.
    pub scope: FestivalId,
    /// Validated title.
    pub title: TaskTitle,
    /// Optional deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Chat message the task was created from, if any.
    pub origin_message: Option<MessageId>,
}

impl NewTask {
    /// Creates a parameter object for a task without deadline or origin.
    #[must_use]
    pub const fn new(scope: FestivalId, title: TaskTitle) -> Self {
        Self {
            scope,
            title,
            due_at: None,
            origin_message: None,
        }
    }

    /// Sets the task deadline.
    #[must_use]
    pub const fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// Marks the task as originating from a chat message.
    #[must_use]
    pub const fn with_origin_message(mut self, message_id: MessageId) -> Self {
        self.origin_message = Some(message_id);
        self
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    scope: FestivalId,
    title: TaskTitle,
    status: TaskStatus,
    created_via_messaging: bool,
    source_messages: Vec<MessageId>,
    due_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted festival scope.
    pub scope: FestivalId,
    /// Persisted title.
    pub title: TaskTitle,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Whether the task was created from a chat message.
    pub created_via_messaging: bool,
    /// Messages that created or transitioned the task.
    pub source_messages: Vec<MessageId>,
    /// Persisted deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new pending task.
    #[must_use]
    pub fn new(params: NewTask, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let NewTask {
            scope,
            title,
            due_at,
            origin_message,
        } = params;

        Self {
            id: TaskId::new(),
            scope,
            title,
            status: TaskStatus::Pending,
            created_via_messaging: origin_message.is_some(),
            source_messages: origin_message.into_iter().collect(),
            due_at,
            completed_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            scope: data.scope,
            title: data.title,
            status: data.status,
            created_via_messaging: data.created_via_messaging,
            source_messages: data.source_messages,
            due_at: data.due_at,
            completed_at: data.completed_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning festival.
    #[must_use]
    pub const fn scope(&self) -> FestivalId {
        self.scope
    }

    /// Returns the task title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the task lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns whether the task was created through the chat integration.
    #[must_use]
    pub const fn created_via_messaging(&self) -> bool {
        self.created_via_messaging
    }

    /// Returns the messages linked to this task, oldest first.
    #[must_use]
    pub fn source_messages(&self) -> &[MessageId] {
        &self.source_messages
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }

    /// Returns the completion timestamp, if completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the given message is linked to this task.
    #[must_use]
    pub fn is_linked_to(&self, message_id: MessageId) -> bool {
        self.source_messages.contains(&message_id)
    }

    /// Transitions the task to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the status
    /// machine forbids the move.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        let timestamp = clock.utc();
        if target == TaskStatus::Completed {
            self.completed_at = Some(timestamp);
        }
        self.updated_at = timestamp;
        Ok(())
    }

    /// Completes the task and stamps the completion time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the task is
    /// already completed or cancelled.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Completed, clock)
    }

    /// Links an originating chat message. Linking twice is a no-op.
    pub fn link_message(&mut self, message_id: MessageId, clock: &impl Clock) {
        if self.is_linked_to(message_id) {
            return;
        }
        self.source_messages.push(message_id);
        self.updated_at = clock.utc();
    }
}
