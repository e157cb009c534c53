//! Service layer for the integration connection state machine.

use crate::integration::{
    domain::{
        AccountId, Integration, IntegrationDomainError, IntegrationId, IntegrationStatus,
        NewIntegration, NotificationPreferences, SecretValue,
    },
    ports::{
        GroupRepository, IntegrationRepository, IntegrationRepositoryError, MessagingPlatform, PlatformError,
    },
    services::{GroupSyncError, GroupSyncService, SyncReport},
};
use crate::task::domain::FestivalId;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request payload for creating an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntegrationRequest {
    owner: AccountId,
    scope: FestivalId,
    channel_id: String,
    channel_secret: SecretValue,
    webhook_url: Option<String>,
    preferences: NotificationPreferences,
}

impl CreateIntegrationRequest {
    /// Creates a request with the required channel credentials.
    #[must_use]
    pub fn new(
        owner: AccountId,
        scope: FestivalId,
        channel_id: impl Into<String>,
        channel_secret: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            scope,
            channel_id: channel_id.into(),
            channel_secret: SecretValue::new(channel_secret),
            webhook_url: None,
            preferences: NotificationPreferences::default(),
        }
    }

    /// Sets the public webhook URL registered with the platform.
    #[must_use]
    pub fn with_webhook_url(mut self, webhook_url: impl Into<String>) -> Self {
        self.webhook_url = Some(webhook_url.into());
        self
    }

    /// Sets the notification preferences.
    #[must_use]
    pub fn with_preferences(mut self, preferences: NotificationPreferences) -> Self {
        self.preferences = preferences;
        self
    }
}

/// Service-level errors for integration lifecycle operations.
#[derive(Debug, Error)]
pub enum IntegrationLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] IntegrationDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] IntegrationRepositoryError),
    /// The platform call failed; the failure has been recorded.
    #[error(transparent)]
    Platform(#[from] PlatformError),
    /// Group persistence failed during synchronization.
    #[error(transparent)]
    GroupSync(GroupSyncError),
    /// No integration exists with the given identifier.
    #[error("integration {0} not found")]
    NotFound(IntegrationId),
    /// The integration has no access token to test.
    #[error("integration {0} has no access token")]
    MissingAccessToken(IntegrationId),
    /// The integration was disconnected by its owner.
    #[error("integration {0} is inactive")]
    Inactive(IntegrationId),
}

/// Versioned writes attempted before a concurrent change is reported.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Result type for integration lifecycle operations.
pub type IntegrationLifecycleResult<T> = Result<T, IntegrationLifecycleError>;

/// Integration connection state machine orchestration.
#[derive(Clone)]
pub struct IntegrationLifecycleService<R, P, C>
where
    R: IntegrationRepository,
    P: MessagingPlatform,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    platform: Arc<P>,
    clock: Arc<C>,
}

impl<R, P, C> IntegrationLifecycleService<R, P, C>
where
    R: IntegrationRepository,
    P: MessagingPlatform,
    C: Clock + Send + Sync,
{
    /// Creates a new lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, platform: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            repository,
            platform,
            clock,
        }
    }

    /// Loads an integration or fails with [`IntegrationLifecycleError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError`] when lookup fails or the
    /// integration does not exist.
    pub async fn get(&self, id: IntegrationId) -> IntegrationLifecycleResult<Integration> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(IntegrationLifecycleError::NotFound(id))
    }

    /// Resolves the integration bound to a platform channel.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError::Repository`] when lookup fails.
    pub async fn find_by_channel_id(
        &self,
        channel_id: &str,
    ) -> IntegrationLifecycleResult<Option<Integration>> {
        Ok(self.repository.find_by_channel_id(channel_id).await?)
    }

    /// Creates a `draft` integration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError`] when credentials are blank or
    /// the owner already has an integration for the festival.
    pub async fn create(
        &self,
        request: CreateIntegrationRequest,
    ) -> IntegrationLifecycleResult<Integration> {
        let integration = Integration::new(
            NewIntegration {
                owner: request.owner,
                scope: request.scope,
                channel_id: request.channel_id,
                channel_secret: request.channel_secret,
                webhook_url: request.webhook_url,
                preferences: request.preferences,
            },
            &*self.clock,
        )?;
        self.repository.store(&integration).await?;
        info!(integration_id = %integration.id(), "integration created");
        Ok(integration)
    }

    /// Verifies the stored access token against the platform.
    ///
    /// Success connects the integration and clears `last_error`; failure
    /// moves it to `error` with the failure recorded.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError::Platform`] or
    /// [`IntegrationLifecycleError::MissingAccessToken`] after recording the
    /// failure, [`IntegrationLifecycleError::Inactive`] when the integration
    /// was disconnected while the platform was being called, or repository
    /// errors.
    pub async fn test_connection(
        &self,
        id: IntegrationId,
    ) -> IntegrationLifecycleResult<Integration> {
        let integration = self.get(id).await?;
        let loaded = integration.status();
        let Some(token) = integration.credentials().access_token().cloned() else {
            self.fail(id, "no access token").await?;
            return Err(IntegrationLifecycleError::MissingAccessToken(id));
        };

        match self.platform.verify_token(&token).await {
            Ok(()) => {
                let connected = self
                    .modify(id, |current| {
                        ensure_not_disconnected(current, loaded)?;
                        current.mark_connected(&*self.clock)?;
                        Ok(())
                    })
                    .await?;
                info!(integration_id = %id, "connection test succeeded");
                Ok(connected)
            }
            Err(err) => {
                self.fail(id, &err.to_string()).await?;
                Err(err.into())
            }
        }
    }

    /// Exchanges channel credentials for an access token and connects.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError::Platform`] after recording the
    /// failure, [`IntegrationLifecycleError::Inactive`] when the integration
    /// was disconnected during the exchange, or domain and repository errors.
    pub async fn authenticate(&self, id: IntegrationId) -> IntegrationLifecycleResult<Integration> {
        let integration = self.get(id).await?;
        let authenticated = self.exchange_token(&integration).await?;
        info!(integration_id = %id, "integration authenticated");
        Ok(authenticated)
    }

    /// Reissues the access token after the platform reported it expired.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError::Inactive`] for disconnected
    /// integrations, including one disconnected during the exchange,
    /// [`IntegrationLifecycleError::Platform`] after recording the failure,
    /// or repository errors.
    pub async fn refresh_access_token(
        &self,
        id: IntegrationId,
    ) -> IntegrationLifecycleResult<Integration> {
        let integration = self.get(id).await?;
        if integration.status() == IntegrationStatus::Inactive {
            return Err(IntegrationLifecycleError::Inactive(id));
        }
        let refreshed = self.exchange_token(&integration).await?;
        info!(integration_id = %id, "access token refreshed");
        Ok(refreshed)
    }

    /// Disconnects the integration, wiping its tokens and webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError`] when lookup or persistence fails.
    pub async fn disconnect(&self, id: IntegrationId) -> IntegrationLifecycleResult<Integration> {
        let disconnected = self
            .modify(id, |current| {
                current.disconnect(&*self.clock);
                Ok(())
            })
            .await?;
        info!(integration_id = %id, "integration disconnected");
        Ok(disconnected)
    }

    /// Records a failed outbound call on the integration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError`] when lookup or persistence fails.
    pub async fn record_failure(
        &self,
        id: IntegrationId,
        error: &str,
    ) -> IntegrationLifecycleResult<Integration> {
        let failed = self
            .modify(id, |current| {
                current.record_failure(error, &*self.clock);
                Ok(())
            })
            .await?;
        warn!(integration_id = %id, status = %failed.status(), error, "integration failure recorded");
        Ok(failed)
    }

    /// Refreshes every active group from the platform.
    ///
    /// Success stamps `last_sync_at` and leaves the status unchanged; a
    /// platform failure is recorded like any other outbound failure.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError::MissingAccessToken`] when the
    /// integration cannot call the platform,
    /// [`IntegrationLifecycleError::Platform`] after recording a failure, or
    /// persistence errors.
    pub async fn sync_groups<G>(
        &self,
        id: IntegrationId,
        groups: &GroupSyncService<G, P, C>,
    ) -> IntegrationLifecycleResult<SyncReport>
    where
        G: GroupRepository,
    {
        let integration = self.get(id).await?;
        let Some(token) = integration.credentials().access_token().cloned() else {
            return Err(IntegrationLifecycleError::MissingAccessToken(id));
        };

        match groups.sync_groups(id, &token).await {
            Ok(report) => {
                self.modify(id, |current| {
                    current.record_sync(&*self.clock);
                    Ok(())
                })
                .await?;
                Ok(report)
            }
            Err(GroupSyncError::Platform(err)) => {
                self.fail(id, &err.to_string()).await?;
                Err(err.into())
            }
            Err(err) => Err(IntegrationLifecycleError::GroupSync(err)),
        }
    }

    /// Replaces the notification preferences.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationLifecycleError`] when lookup or persistence fails.
    pub async fn update_preferences(
        &self,
        id: IntegrationId,
        preferences: NotificationPreferences,
    ) -> IntegrationLifecycleResult<Integration> {
        self.modify(id, |current| {
            current.update_preferences(preferences.clone(), &*self.clock);
            Ok(())
        })
        .await
    }

    async fn exchange_token(
        &self,
        integration: &Integration,
    ) -> IntegrationLifecycleResult<Integration> {
        let id = integration.id();
        let loaded = integration.status();
        let credentials = integration.credentials();
        let result = self
            .platform
            .issue_token(credentials.channel_id(), credentials.channel_secret())
            .await;
        match result {
            Ok(grant) => {
                self.modify(id, |current| {
                    ensure_not_disconnected(current, loaded)?;
                    current.authenticate(grant.clone(), &*self.clock)?;
                    Ok(())
                })
                .await
            }
            Err(err) => {
                self.fail(id, &err.to_string()).await?;
                Err(err.into())
            }
        }
    }

    async fn fail(&self, id: IntegrationId, error: &str) -> IntegrationLifecycleResult<()> {
        self.modify(id, |current| {
            current.record_failure(error, &*self.clock);
            Ok(())
        })
        .await?;
        warn!(integration_id = %id, error, "platform call failed");
        Ok(())
    }

    /// Applies `change` to the stored integration and writes it back.
    ///
    /// Each attempt reloads the row, so a change always sees the latest
    /// state. A write that loses a race with another writer is reapplied.
    async fn modify<F>(&self, id: IntegrationId, mut change: F) -> IntegrationLifecycleResult<Integration>
    where
        F: FnMut(&mut Integration) -> IntegrationLifecycleResult<()> + Send,
    {
        let mut attempt = 1;
        loop {
            let mut integration = self.get(id).await?;
            change(&mut integration)?;
            match self.repository.update(&integration).await {
                Ok(stored) => return Ok(stored),
                Err(IntegrationRepositoryError::Conflict(_)) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(integration_id = %id, attempt, "integration changed concurrently, reapplying");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Refuses to revive an integration its owner disconnected while a platform
/// call was in flight.
fn ensure_not_disconnected(
    current: &Integration,
    loaded: IntegrationStatus,
) -> IntegrationLifecycleResult<()> {
    if current.status() == IntegrationStatus::Inactive && loaded != IntegrationStatus::Inactive {
        return Err(IntegrationLifecycleError::Inactive(current.id()));
    }
    Ok(())
}
