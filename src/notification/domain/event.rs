//! Notification payloads carried by the work queue.

use super::NotificationKind;
use crate::integration::domain::IntegrationId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened, with the data needed to render the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A task was created from a chat message.
    TaskCreated {
        /// Created task.
        task_id: TaskId,
        /// Task title.
        title: String,
    },
    /// A task was completed from a chat message.
    TaskCompleted {
        /// Completed task.
        task_id: TaskId,
        /// Task title.
        title: String,
    },
    /// A task deadline is approaching.
    DeadlineReminder {
        /// Task due soon.
        task_id: TaskId,
        /// Task title.
        title: String,
        /// Deadline.
        due_at: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Returns the preference switch governing this event.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::TaskCreated { .. } => NotificationKind::TaskCreated,
            Self::TaskCompleted { .. } => NotificationKind::TaskCompleted,
            Self::DeadlineReminder { .. } => NotificationKind::DeadlineReminder,
        }
    }

    /// Returns the task the event refers to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::DeadlineReminder { task_id, .. } => *task_id,
        }
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::TaskCreated { title, .. }
            | Self::TaskCompleted { title, .. }
            | Self::DeadlineReminder { title, .. } => title,
        }
    }
}

/// Who receives a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NotificationTarget {
    /// A single platform group, room or user.
    Recipient(String),
    /// Every group the bot is currently a member of.
    ActiveGroups,
}

/// A queued outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundNotification {
    /// Integration whose bot sends the message.
    pub integration_id: IntegrationId,
    /// Event being announced.
    pub event: NotificationEvent,
    /// Recipients.
    pub target: NotificationTarget,
    /// Urgent notifications ignore quiet hours.
    pub urgent: bool,
}

impl OutboundNotification {
    /// Creates a non-urgent notification.
    #[must_use]
    pub const fn new(
        integration_id: IntegrationId,
        event: NotificationEvent,
        target: NotificationTarget,
    ) -> Self {
        Self {
            integration_id,
            event,
            target,
            urgent: false,
        }
    }

    /// Marks the notification as urgent.
    #[must_use]
    pub const fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }
}
