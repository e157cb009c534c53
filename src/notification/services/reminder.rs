//! Deadline reminders for open tasks.

use crate::integration::domain::Integration;
use crate::notification::domain::{NotificationEvent, NotificationTarget, OutboundNotification};
use crate::queue::{
    domain::Job,
    ports::{JobQueue, QueueError},
};
use crate::task::{
    ports::TaskRepository,
    services::{TaskLifecycleError, TaskLifecycleService},
};
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while scheduling reminders.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Task lookup failed.
    #[error(transparent)]
    Task(#[from] TaskLifecycleError),
    /// Enqueueing failed.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Enqueues urgent reminders for tasks nearing their deadline.
pub struct ReminderService<T, Q, C>
where
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    tasks: TaskLifecycleService<T, C>,
    queue: Arc<Q>,
    clock: Arc<C>,
}

impl<T, Q, C> ReminderService<T, Q, C>
where
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates a reminder service.
    #[must_use]
    pub const fn new(tasks: TaskLifecycleService<T, C>, queue: Arc<Q>, clock: Arc<C>) -> Self {
        Self {
            tasks,
            queue,
            clock,
        }
    }

    /// Enqueues one reminder per open task of the integration's festival
    /// due within `window` from now. Reminders go to every active group and
    /// ignore quiet hours.
    ///
    /// Returns the number of reminders enqueued; integrations that cannot
    /// send get none.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError`] when task lookup or enqueueing fails.
    pub async fn enqueue_due_reminders(
        &self,
        integration: &Integration,
        window: Duration,
    ) -> Result<usize, ReminderError> {
        if !integration.can_send() {
            debug!(integration_id = %integration.id(), status = %integration.status(), "reminders skipped");
            return Ok(0);
        }
        let until = self.clock.utc() + window;
        let due = self
            .tasks
            .find_due_open_tasks(integration.scope(), until)
            .await?;

        let mut enqueued = 0;
        for task in due {
            let Some(due_at) = task.due_at() else {
                continue;
            };
            let notification = OutboundNotification::new(
                integration.id(),
                NotificationEvent::DeadlineReminder {
                    task_id: task.id(),
                    title: task.title().as_str().to_owned(),
                    due_at,
                },
                NotificationTarget::ActiveGroups,
            )
            .urgent();
            self.queue
                .enqueue(&Job::DispatchNotification(notification))
                .await?;
            enqueued += 1;
        }
        info!(integration_id = %integration.id(), enqueued, "deadline reminders enqueued");
        Ok(enqueued)
    }
}
