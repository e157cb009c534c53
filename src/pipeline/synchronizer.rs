//! Store, classify and apply one inbound message.

use crate::integration::domain::{Integration, IntegrationId};
use crate::message::{
    domain::{
        InboundMessage, Intent, IntentType, MessageDomainError, MessageId, NewInboundMessage,
        classify,
    },
    ports::{InsertOutcome, MessageRepository, MessageRepositoryError},
};
use crate::notification::domain::{NotificationEvent, NotificationTarget, OutboundNotification};
use crate::queue::{domain::Job, ports::JobQueue};
use crate::task::{
    domain::{FestivalId, Task, TaskId},
    ports::TaskRepository,
    services::{CreateTaskRequest, TaskLifecycleError, TaskLifecycleService},
};
use crate::webhook::InboundEvent;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that leave a message unprocessed and eligible for retry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Message state rejected the outcome.
    #[error(transparent)]
    Message(#[from] MessageDomainError),
    /// Message persistence failed.
    #[error(transparent)]
    MessageRepository(#[from] MessageRepositoryError),
    /// The task change failed.
    #[error(transparent)]
    Task(#[from] TaskLifecycleError),
}

/// What processing did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The message was classified and its intent applied.
    Processed {
        /// Stored message.
        message_id: MessageId,
        /// Classified intent.
        intent: IntentType,
        /// Task created or completed, if any.
        task_id: Option<TaskId>,
    },
    /// The message was already stored; nothing was done.
    Duplicate {
        /// Stored message.
        message_id: MessageId,
    },
    /// Processing failed and the retry budget is spent.
    PermanentlyFailed {
        /// Stored message.
        message_id: MessageId,
    },
}

/// Retry budget for message processing.
///
/// The budget counts queue claims, so it must not exceed the queue's own
/// attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Attempt after whose failure a message is flagged for inspection.
    pub max_message_attempts: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_message_attempts: 5,
        }
    }
}

/// Message pipeline from stored message to task change.
pub struct MessageSynchronizer<M, T, Q, C>
where
    M: MessageRepository,
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    messages: Arc<M>,
    tasks: TaskLifecycleService<T, C>,
    queue: Arc<Q>,
    clock: Arc<C>,
    settings: SyncSettings,
}

impl<M, T, Q, C> MessageSynchronizer<M, T, Q, C>
where
    M: MessageRepository,
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates a synchronizer.
    #[must_use]
    pub const fn new(
        messages: Arc<M>,
        tasks: TaskLifecycleService<T, C>,
        queue: Arc<Q>,
        clock: Arc<C>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            messages,
            tasks,
            queue,
            clock,
            settings,
        }
    }

    /// Processes claim `attempt` (1-based) of `event` for `integration`.
    ///
    /// The first delivery stores and processes the message. A redelivery of
    /// a stored message is a no-op, except that a queue retry (`attempt`
    /// above 1) resumes a stored message that is neither processed nor
    /// permanently failed. A failure on or after attempt
    /// `max_message_attempts` flags the message, even when earlier claims
    /// were lost without recording a failure.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when processing failed but may be retried. The
    /// failure is recorded on the message first.
    pub async fn process(
        &self,
        integration: &Integration,
        event: &InboundEvent,
        attempt: u32,
    ) -> Result<SyncOutcome, SyncError> {
        let is_retry = attempt > 1;
        let candidate = self.candidate(integration.id(), event);

        let (mut message, resumed) = match self.messages.insert_new(&candidate).await? {
            InsertOutcome::Inserted => (candidate, false),
            InsertOutcome::AlreadyExists(existing) if is_retry && existing.is_resumable() => {
                debug!(message_id = %existing.id(), attempts = existing.processing_attempts(), "resuming stored message");
                (existing, true)
            }
            InsertOutcome::AlreadyExists(existing) => {
                debug!(
                    message_id = %existing.id(),
                    platform_message_id = %existing.platform_message_id(),
                    "duplicate delivery ignored"
                );
                return Ok(SyncOutcome::Duplicate {
                    message_id: existing.id(),
                });
            }
        };

        match self.apply(integration, &mut message, event, resumed).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.record_failure(&mut message, err, attempt).await,
        }
    }

    /// Flags the message of a delivery the queue stopped retrying.
    ///
    /// A delivery that crashed before its message was stored is stored now,
    /// so every abandoned message is listed for inspection. Processed or
    /// already flagged messages are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MessageRepository`] when the message cannot be
    /// stored or updated.
    pub async fn abandon(
        &self,
        integration_id: IntegrationId,
        event: &InboundEvent,
        reason: &str,
    ) -> Result<(), SyncError> {
        let candidate = self.candidate(integration_id, event);
        let mut message = match self.messages.insert_new(&candidate).await? {
            InsertOutcome::Inserted => candidate,
            InsertOutcome::AlreadyExists(existing) if existing.is_resumable() => existing,
            InsertOutcome::AlreadyExists(_) => return Ok(()),
        };
        message.record_failure(reason);
        message.mark_permanently_failed();
        self.messages.update(&message).await?;
        error!(
            message_id = %message.id(),
            %integration_id,
            attempts = message.processing_attempts(),
            reason,
            "message permanently failed"
        );
        Ok(())
    }

    fn candidate(&self, integration_id: IntegrationId, event: &InboundEvent) -> InboundMessage {
        InboundMessage::new(
            NewInboundMessage {
                integration_id,
                platform_message_id: event.message_id.clone(),
                group_ref: event.source.group_ref().map(str::to_owned),
                sender_id: event.source.sender_id().map(str::to_owned),
                text: event.text.clone(),
                sent_at: event.sent_at().unwrap_or_else(|| self.clock.utc()),
            },
            &*self.clock,
        )
    }

    async fn apply(
        &self,
        integration: &Integration,
        message: &mut InboundMessage,
        event: &InboundEvent,
        resumed: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let (intent, applied) = self
            .resolve_intent(integration.scope(), message, resumed)
            .await?;

        let task = match (&intent, applied) {
            (_, Some(task)) => Some(task),
            (Intent::TaskCreation { title }, None) => {
                let request = CreateTaskRequest::new(integration.scope(), title.clone())
                    .with_origin(message.id());
                Some(self.tasks.create_task(request).await?)
            }
            (Intent::TaskCompletion { task_id }, None) => Some(
                self.tasks
                    .complete_task(*task_id, message.id())
                    .await?
                    .into_task(),
            ),
            (Intent::None | Intent::Unrecognized, None) => None,
        };

        let task_id = task.as_ref().map(Task::id);
        message.record_outcome(intent.intent_type(), task_id)?;
        self.messages.update(message).await?;
        info!(
            message_id = %message.id(),
            integration_id = %integration.id(),
            intent = %intent.intent_type(),
            task_id = ?task_id,
            "message processed"
        );

        if let Some(notification_event) = task
            .as_ref()
            .and_then(|task| notification_for(intent.intent_type(), task))
        {
            self.notify(
                OutboundNotification::new(
                    integration.id(),
                    notification_event,
                    NotificationTarget::Recipient(event.source.reply_target().to_owned()),
                ),
                message.id(),
            )
            .await;
        }

        Ok(SyncOutcome::Processed {
            message_id: message.id(),
            intent: intent.intent_type(),
            task_id,
        })
    }

    /// Classifies the message against the festival's open tasks.
    ///
    /// A resumed message may already have changed a task before its outcome
    /// was recorded. That task is returned alongside the intent it implies
    /// and is not changed again.
    async fn resolve_intent(
        &self,
        scope: FestivalId,
        message: &InboundMessage,
        resumed: bool,
    ) -> Result<(Intent, Option<Task>), SyncError> {
        if resumed && let Some(task) = self.tasks.find_by_source_message(message.id()).await? {
            let created_here = task.created_via_messaging()
                && task.source_messages().first() == Some(&message.id());
            let intent = if created_here {
                Intent::TaskCreation {
                    title: task.title().as_str().to_owned(),
                }
            } else {
                Intent::TaskCompletion { task_id: task.id() }
            };
            debug!(message_id = %message.id(), task_id = %task.id(), "task already changed by this message");
            return Ok((intent, Some(task)));
        }
        let open_tasks = self.tasks.find_open_tasks(scope).await?;
        Ok((classify(message.text(), &open_tasks), None))
    }

    async fn notify(&self, notification: OutboundNotification, message_id: MessageId) {
        let kind = notification.event.kind();
        if let Err(err) = self
            .queue
            .enqueue(&Job::DispatchNotification(notification))
            .await
        {
            warn!(%message_id, %kind, error = %err, "failed to enqueue notification");
        }
    }

    async fn record_failure(
        &self,
        message: &mut InboundMessage,
        err: SyncError,
        attempt: u32,
    ) -> Result<SyncOutcome, SyncError> {
        message.record_failure(err.to_string());
        let exhausted =
            attempt.max(message.processing_attempts()) >= self.settings.max_message_attempts;
        if exhausted {
            message.mark_permanently_failed();
            error!(
                message_id = %message.id(),
                attempt,
                attempts = message.processing_attempts(),
                error = %err,
                "message permanently failed"
            );
        } else {
            warn!(
                message_id = %message.id(),
                attempt,
                attempts = message.processing_attempts(),
                error = %err,
                "message processing failed"
            );
        }

        if let Err(update_err) = self.messages.update(message).await {
            warn!(message_id = %message.id(), error = %update_err, "failed to record message failure");
        }

        if exhausted {
            Ok(SyncOutcome::PermanentlyFailed {
                message_id: message.id(),
            })
        } else {
            Err(err)
        }
    }
}

fn notification_for(intent: IntentType, task: &Task) -> Option<NotificationEvent> {
    let task_id = task.id();
    let title = task.title().as_str().to_owned();
    match intent {
        IntentType::TaskCreation => Some(NotificationEvent::TaskCreated { task_id, title }),
        IntentType::TaskCompletion => Some(NotificationEvent::TaskCompleted { task_id, title }),
        IntentType::None | IntentType::Unrecognized => None,
    }
}
