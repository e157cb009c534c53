//! Decides whether and where a notification is sent, then sends it.

use super::MessageFormatter;
use crate::integration::{
    domain::{Group, Integration, SecretValue},
    ports::{GroupRepository, IntegrationRepository, MessagingPlatform, PlatformError},
    services::{IntegrationLifecycleError, IntegrationLifecycleService},
};
use crate::notification::domain::{
    DispatchOutcome, NotificationTarget, OutboundNotification, SuppressionReason,
};
use crate::queue::domain::BackoffPolicy;
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Retry budget for platform sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Sends attempted per recipient before giving up.
    pub max_attempts: u32,
    /// Delay between retryable failures.
    pub backoff: BackoffPolicy,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::new(
                std::time::Duration::from_secs(1),
                std::time::Duration::from_secs(30),
            ),
        }
    }
}

/// Sends outbound notifications on behalf of an integration.
///
/// Dispatch never returns an error: every failure ends as
/// [`DispatchOutcome::Failed`] with the failure recorded on the
/// integration.
pub struct NotificationDispatcher<R, G, P, C>
where
    R: IntegrationRepository,
    G: GroupRepository,
    P: MessagingPlatform,
    C: Clock + Send + Sync,
{
    integrations: IntegrationLifecycleService<R, P, C>,
    groups: Arc<G>,
    platform: Arc<P>,
    clock: Arc<C>,
    formatter: MessageFormatter,
    settings: DispatchSettings,
}

impl<R, G, P, C> NotificationDispatcher<R, G, P, C>
where
    R: IntegrationRepository,
    G: GroupRepository,
    P: MessagingPlatform,
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(
        integrations: IntegrationLifecycleService<R, P, C>,
        groups: Arc<G>,
        platform: Arc<P>,
        clock: Arc<C>,
        formatter: MessageFormatter,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            integrations,
            groups,
            platform,
            clock,
            formatter,
            settings,
        }
    }

    /// Dispatches one notification.
    pub async fn dispatch(&self, notification: &OutboundNotification) -> DispatchOutcome {
        let integration_id = notification.integration_id;
        let kind = notification.event.kind();
        let integration = match self.integrations.get(integration_id).await {
            Ok(integration) => integration,
            Err(err) => {
                warn!(%integration_id, %kind, error = %err, "notification dropped: integration unavailable");
                return DispatchOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };

        if let Some(reason) = self.suppression(&integration, notification) {
            info!(%integration_id, %kind, %reason, "notification suppressed");
            return DispatchOutcome::Suppressed(reason);
        }

        let preferences = integration.notification_preferences();
        let text = match self.formatter.render(&notification.event, preferences.time_zone) {
            Ok(text) => text,
            Err(err) => return self.give_up(&integration, &err.to_string()).await,
        };

        let recipients = match self.recipients(&integration, &notification.target).await {
            Ok(recipients) => recipients,
            Err(err) => return self.give_up(&integration, &err).await,
        };
        if recipients.is_empty() {
            info!(%integration_id, %kind, reason = %SuppressionReason::NoRecipients, "notification suppressed");
            return DispatchOutcome::Suppressed(SuppressionReason::NoRecipients);
        }

        let Some(mut token) = integration.credentials().access_token().cloned() else {
            return self.give_up(&integration, "no access token").await;
        };
        for recipient in &recipients {
            if let Err(err) = self
                .send_with_retry(&integration, &mut token, recipient, &text)
                .await
            {
                return self.give_up(&integration, &err.to_string()).await;
            }
        }
        info!(%integration_id, %kind, delivered = recipients.len(), "notification sent");
        DispatchOutcome::Sent {
            delivered: recipients.len(),
        }
    }

    fn suppression(
        &self,
        integration: &Integration,
        notification: &OutboundNotification,
    ) -> Option<SuppressionReason> {
        let preferences = integration.notification_preferences();
        if !integration.can_send() {
            Some(SuppressionReason::NotConnected)
        } else if !preferences.is_enabled(notification.event.kind()) {
            Some(SuppressionReason::Disabled)
        } else if !notification.urgent && preferences.in_quiet_hours(self.clock.utc()) {
            Some(SuppressionReason::QuietHours)
        } else {
            None
        }
    }

    async fn recipients(
        &self,
        integration: &Integration,
        target: &NotificationTarget,
    ) -> Result<Vec<String>, String> {
        match target {
            NotificationTarget::Recipient(to) => Ok(vec![to.clone()]),
            NotificationTarget::ActiveGroups => {
                let groups = self
                    .groups
                    .list_by_integration(integration.id())
                    .await
                    .map_err(|err| err.to_string())?;
                Ok(groups
                    .into_iter()
                    .filter(Group::is_active)
                    .map(|group| group.platform_group_id().to_owned())
                    .collect())
            }
        }
    }

    async fn send_with_retry(
        &self,
        integration: &Integration,
        token: &mut SecretValue,
        to: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        let mut attempt = 1;
        let mut refreshed = false;
        loop {
            match self.platform.push_message(token, to, text).await {
                Ok(()) => return Ok(()),
                Err(PlatformError::TokenExpired) if !refreshed => {
                    refreshed = true;
                    *token = self.refresh(integration).await?;
                }
                Err(err) if err.is_retryable() && attempt < self.settings.max_attempts => {
                    let delay = self.settings.backoff.delay_for(attempt);
                    warn!(
                        integration_id = %integration.id(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "push failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn refresh(&self, integration: &Integration) -> Result<SecretValue, PlatformError> {
        let refreshed = self
            .integrations
            .refresh_access_token(integration.id())
            .await
            .map_err(|err| match err {
                IntegrationLifecycleError::Platform(platform) => platform,
                other => PlatformError::Transient(other.to_string()),
            })?;
        refreshed
            .credentials()
            .access_token()
            .cloned()
            .ok_or(PlatformError::TokenExpired)
    }

    async fn give_up(&self, integration: &Integration, error: &str) -> DispatchOutcome {
        if let Err(err) = self.integrations.record_failure(integration.id(), error).await {
            warn!(integration_id = %integration.id(), error = %err, "failed to record notification failure");
        }
        warn!(integration_id = %integration.id(), error, "notification failed");
        DispatchOutcome::Failed {
            error: error.to_owned(),
        }
    }
}
