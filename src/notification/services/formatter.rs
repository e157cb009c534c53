//! Message bodies rendered with `minijinja`.

use crate::notification::domain::NotificationEvent;
use chrono_tz::Tz;
use minijinja::{Environment, context};
use thiserror::Error;

const TASK_CREATED: &str = "📝 タスクを登録しました: {{ title }}";
const TASK_COMPLETED: &str = "✅ タスクが完了しました: {{ title }}";
const DEADLINE_REMINDER: &str = "⏰ 期限が近づいています: {{ title }}（{{ due }} まで）";

/// Template rendering failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to render {kind} notification: {reason}")]
pub struct FormatError {
    /// Notification kind being rendered.
    pub kind: &'static str,
    /// Renderer message.
    pub reason: String,
}

/// Renders notification text from per-kind templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormatter {
    task_created: String,
    task_completed: String,
    deadline_reminder: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self {
            task_created: TASK_CREATED.to_owned(),
            task_completed: TASK_COMPLETED.to_owned(),
            deadline_reminder: DEADLINE_REMINDER.to_owned(),
        }
    }
}

impl MessageFormatter {
    /// Creates a formatter with the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `event`, formatting deadlines in `time_zone`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the template fails to render.
    pub fn render(&self, event: &NotificationEvent, time_zone: Tz) -> Result<String, FormatError> {
        let environment = Environment::new();
        let kind = event.kind().as_str();
        let rendered = match event {
            NotificationEvent::TaskCreated { title, .. } => {
                environment.render_str(&self.task_created, context! { title })
            }
            NotificationEvent::TaskCompleted { title, .. } => {
                environment.render_str(&self.task_completed, context! { title })
            }
            NotificationEvent::DeadlineReminder { title, due_at, .. } => {
                let due = due_at
                    .with_timezone(&time_zone)
                    .format("%m/%d %H:%M")
                    .to_string();
                environment.render_str(&self.deadline_reminder, context! { title, due })
            }
        };
        rendered.map_err(|err| FormatError {
            kind,
            reason: err.to_string(),
        })
    }
}
