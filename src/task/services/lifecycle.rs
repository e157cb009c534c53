//! Service layer for chat-driven task creation and completion.

use crate::message::domain::MessageId;
use crate::task::{
    domain::{FestivalId, NewTask, Task, TaskDomainError, TaskId, TaskStatus, TaskTitle},
    ports::{TaskRepository, TaskRepositoryError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    scope: FestivalId,
    title: String,
    origin: Option<MessageId>,
    due_at: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(scope: FestivalId, title: impl Into<String>) -> Self {
        Self {
            scope,
            title: title.into(),
            origin: None,
            due_at: None,
        }
    }

    /// Records the chat message the task originates from.
    #[must_use]
    pub const fn with_origin(mut self, message_id: MessageId) -> Self {
        self.origin = Some(message_id);
        self
    }

    /// Sets the task deadline.
    #[must_use]
    pub const fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }
}

/// Result of a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The task moved to `completed` now.
    Completed(Task),
    /// The task had already been completed by this message.
    AlreadyCompleted(Task),
}

impl CompletionOutcome {
    /// Returns the task regardless of outcome.
    #[must_use]
    pub const fn task(&self) -> &Task {
        match self {
            Self::Completed(task) | Self::AlreadyCompleted(task) => task,
        }
    }

    /// Consumes the outcome and returns the task.
    #[must_use]
    pub fn into_task(self) -> Task {
        match self {
            Self::Completed(task) | Self::AlreadyCompleted(task) => task,
        }
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a pending task.
    ///
    /// When the request carries an origin message that is already linked to
    /// a task, that task is returned instead of creating a second one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the title is invalid or the
    /// repository rejects persistence.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        if let Some(origin) = request.origin
            && let Some(existing) = self.repository.find_by_source_message(origin).await?
        {
            debug!(task_id = %existing.id(), message_id = %origin, "task already created from message");
            return Ok(existing);
        }

        let title = TaskTitle::new(request.title)?;
        let mut params = NewTask::new(request.scope, title);
        if let Some(origin) = request.origin {
            params = params.with_origin_message(origin);
        }
        if let Some(due_at) = request.due_at {
            params = params.with_due_at(due_at);
        }

        let task = Task::new(params, &*self.clock);
        self.repository.store(&task).await?;
        Ok(task)
    }

    /// Completes a task and links the completing message.
    ///
    /// A task that is already completed and linked to `message_id` yields
    /// [`CompletionOutcome::AlreadyCompleted`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task is missing and
    /// [`TaskLifecycleError::Domain`] when the task cannot be completed.
    pub async fn complete_task(
        &self,
        task_id: TaskId,
        message_id: MessageId,
    ) -> TaskLifecycleResult<CompletionOutcome> {
        let mut task = self
            .repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))?;

        if task.status() == TaskStatus::Completed && task.is_linked_to(message_id) {
            return Ok(CompletionOutcome::AlreadyCompleted(task));
        }

        task.complete(&*self.clock)?;
        task.link_message(message_id, &*self.clock);
        self.repository.update(&task).await?;
        Ok(CompletionOutcome::Completed(task))
    }

    /// Returns the open tasks of a festival, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_open_tasks(&self, scope: FestivalId) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.repository.find_open_by_scope(scope).await?)
    }

    /// Returns the task created or completed by `message_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_by_source_message(
        &self,
        message_id: MessageId,
    ) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_source_message(message_id).await?)
    }

    /// Returns open tasks whose deadline falls in `[now, until]`, soonest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_due_open_tasks(
        &self,
        scope: FestivalId,
        until: DateTime<Utc>,
    ) -> TaskLifecycleResult<Vec<Task>> {
        let now = self.clock.utc();
        let mut due: Vec<Task> = self
            .repository
            .find_open_by_scope(scope)
            .await?
            .into_iter()
            .filter(|task| task.due_at().is_some_and(|due_at| due_at >= now && due_at <= until))
            .collect();
        due.sort_by_key(|task| (task.due_at(), task.id()));
        Ok(due)
    }
}
