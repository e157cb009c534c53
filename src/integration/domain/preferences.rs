//! Per-integration notification preferences and quiet hours.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of outbound notification an integration can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A task was created from a chat message.
    TaskCreated,
    /// A task was completed from a chat message.
    TaskCompleted,
    /// A task deadline is approaching.
    DeadlineReminder,
}

impl NotificationKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskCompleted => "task_completed",
            Self::DeadlineReminder => "deadline_reminder",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification switches and the quiet-hours window.
///
/// The window is `[quiet_start, quiet_end)` in `time_zone` local time and
/// wraps midnight when `quiet_start > quiet_end`. Equal bounds describe an
/// empty window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationPreferences {
    /// Send a message when a task is created from chat.
    pub task_created: bool,
    /// Send a message when a task is completed from chat.
    pub task_completed: bool,
    /// Send deadline reminders.
    pub deadline_reminder: bool,
    /// Whether the quiet-hours window applies.
    pub quiet_hours_enabled: bool,
    /// Start of the quiet window (inclusive).
    pub quiet_start: NaiveTime,
    /// End of the quiet window (exclusive).
    pub quiet_end: NaiveTime,
    /// Time zone the window is evaluated in.
    pub time_zone: Tz,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            task_created: true,
            task_completed: true,
            deadline_reminder: true,
            quiet_hours_enabled: false,
            quiet_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            quiet_end: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            time_zone: chrono_tz::Asia::Tokyo,
        }
    }
}

impl NotificationPreferences {
    /// Returns whether `kind` notifications are switched on.
    #[must_use]
    pub const fn is_enabled(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::TaskCreated => self.task_created,
            NotificationKind::TaskCompleted => self.task_completed,
            NotificationKind::DeadlineReminder => self.deadline_reminder,
        }
    }

    /// Enables quiet hours with the given window.
    #[must_use]
    pub const fn with_quiet_hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.quiet_hours_enabled = true;
        self.quiet_start = start;
        self.quiet_end = end;
        self
    }

    /// Sets the time zone used to evaluate the quiet window.
    #[must_use]
    pub const fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Returns whether `instant` falls inside the quiet window.
    #[must_use]
    pub fn in_quiet_hours(&self, instant: DateTime<Utc>) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }
        let local_time = instant.with_timezone(&self.time_zone).time();
        window_contains(self.quiet_start, self.quiet_end, local_time)
    }
}

fn window_contains(start: NaiveTime, end: NaiveTime, time: NaiveTime) -> bool {
    match start.cmp(&end) {
        std::cmp::Ordering::Less => start <= time && time < end,
        std::cmp::Ordering::Greater => time >= start || time < end,
        std::cmp::Ordering::Equal => false,
    }
}
