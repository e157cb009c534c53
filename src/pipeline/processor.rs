//! Routes claimed jobs to the services that handle them.

use super::{MessageSynchronizer, SyncOutcome};
use crate::integration::{
    domain::Integration,
    ports::{GroupRepository, IntegrationRepository, MessagingPlatform},
    services::{GroupSyncService, IntegrationLifecycleError, IntegrationLifecycleService},
};
use crate::message::ports::MessageRepository;
use crate::notification::services::NotificationDispatcher;
use crate::queue::{
    domain::{ClaimedJob, Job},
    ports::JobQueue,
    services::{HandlerError, JobHandler},
};
use crate::task::ports::TaskRepository;
use crate::webhook::{InboundEvent, MembershipEvent};
use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

/// [`JobHandler`] for every [`Job`] kind.
pub struct JobProcessor<R, G, P, M, T, Q, C>
where
    R: IntegrationRepository,
    G: GroupRepository,
    P: MessagingPlatform,
    M: MessageRepository,
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    integrations: IntegrationLifecycleService<R, P, C>,
    groups: GroupSyncService<G, P, C>,
    synchronizer: MessageSynchronizer<M, T, Q, C>,
    dispatcher: NotificationDispatcher<R, G, P, C>,
}

impl<R, G, P, M, T, Q, C> JobProcessor<R, G, P, M, T, Q, C>
where
    R: IntegrationRepository,
    G: GroupRepository,
    P: MessagingPlatform,
    M: MessageRepository,
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates a processor from its collaborating services.
    #[must_use]
    pub const fn new(
        integrations: IntegrationLifecycleService<R, P, C>,
        groups: GroupSyncService<G, P, C>,
        synchronizer: MessageSynchronizer<M, T, Q, C>,
        dispatcher: NotificationDispatcher<R, G, P, C>,
    ) -> Self {
        Self {
            integrations,
            groups,
            synchronizer,
            dispatcher,
        }
    }

    async fn load_integration(&self, job: &Job) -> Result<Integration, HandlerError> {
        match self.integrations.get(job.integration_id()).await {
            Ok(integration) => Ok(integration),
            Err(err @ IntegrationLifecycleError::NotFound(_)) => {
                Err(HandlerError::Permanent(err.to_string()))
            }
            Err(err) => Err(HandlerError::Retryable(err.to_string())),
        }
    }

    async fn process_message(
        &self,
        integration: &Integration,
        event: &InboundEvent,
        attempt: u32,
    ) -> Result<(), HandlerError> {
        if let Some(group_ref) = event.source.group_ref()
            && let Some(at) = event.sent_at()
            && let Err(err) = self
                .groups
                .touch_activity(integration.id(), group_ref, at)
                .await
        {
            warn!(integration_id = %integration.id(), group = group_ref, error = %err, "failed to record group activity");
        }

        match self.synchronizer.process(integration, event, attempt).await {
            Ok(SyncOutcome::Processed {
                message_id, intent, ..
            }) => {
                debug!(%message_id, %intent, "message job done");
                Ok(())
            }
            Ok(SyncOutcome::Duplicate { message_id }) => {
                debug!(%message_id, "duplicate message job");
                Ok(())
            }
            Ok(SyncOutcome::PermanentlyFailed { message_id }) => Err(HandlerError::Permanent(
                format!("message {message_id} permanently failed"),
            )),
            Err(err) => Err(HandlerError::Retryable(err.to_string())),
        }
    }

    async fn sync_membership(
        &self,
        integration: &Integration,
        event: &MembershipEvent,
    ) -> Result<(), HandlerError> {
        let Some(group_ref) = event.source.group_ref() else {
            return Err(HandlerError::Permanent(
                "membership event without a group".to_owned(),
            ));
        };
        self.groups
            .apply_membership(integration, group_ref, event.change)
            .await
            .map(|_| ())
            .map_err(|err| HandlerError::Retryable(err.to_string()))
    }
}

#[async_trait]
impl<R, G, P, M, T, Q, C> JobHandler for JobProcessor<R, G, P, M, T, Q, C>
where
    R: IntegrationRepository,
    G: GroupRepository,
    P: MessagingPlatform,
    M: MessageRepository,
    T: TaskRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    async fn handle(&self, claimed: &ClaimedJob) -> Result<(), HandlerError> {
        match &claimed.job {
            Job::ProcessMessage { event, .. } => {
                let integration = self.load_integration(&claimed.job).await?;
                self.process_message(&integration, event, claimed.attempt)
                    .await
            }
            Job::SyncMembership { event, .. } => {
                let integration = self.load_integration(&claimed.job).await?;
                self.sync_membership(&integration, event).await
            }
            Job::DispatchNotification(notification) => {
                let outcome = self.dispatcher.dispatch(notification).await;
                info!(job_id = %claimed.id, kind = %notification.event.kind(), ?outcome, "notification job done");
                Ok(())
            }
        }
    }

    async fn on_failed(&self, job: &Job, reason: &str) {
        if let Job::ProcessMessage {
            integration_id,
            event,
        } = job
            && let Err(err) = self
                .synchronizer
                .abandon(*integration_id, event, reason)
                .await
        {
            warn!(%integration_id, message_id = %event.message_id, error = %err, "failed to flag abandoned message");
        }
    }
}
