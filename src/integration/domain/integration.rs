//! Integration aggregate root: one chat channel bound to a festival.

use super::{
    AccountId, Credentials, IntegrationDomainError, IntegrationId, IntegrationStatus,
    NotificationPreferences, SecretValue, TokenGrant,
};
use crate::task::domain::FestivalId;
use chrono::{DateTime, Utc};
use mockable::Clock;

/// Parameter object for creating an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntegration {
    /// Owning account.
    pub owner: AccountId,
    /// Festival the integration serves.
    pub scope: FestivalId,
    /// Platform channel identifier.
    pub channel_id: String,
    /// Channel secret used for webhook signatures and token exchange.
    pub channel_secret: SecretValue,
    /// Public webhook URL registered with the platform.
    pub webhook_url: Option<String>,
    /// Initial notification preferences.
    pub preferences: NotificationPreferences,
}

/// Chat-platform integration aggregate root.
///
/// Credentials are only reachable through [`Integration::credentials`],
/// which the lifecycle service and the outbound platform adapter use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    id: IntegrationId,
    owner: AccountId,
    scope: FestivalId,
    credentials: Credentials,
    status: IntegrationStatus,
    webhook_url: Option<String>,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
    last_webhook_received_at: Option<DateTime<Utc>>,
    last_sync_at: Option<DateTime<Utc>>,
    notification_preferences: NotificationPreferences,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

/// Parameter object for reconstructing a persisted integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedIntegrationData {
    /// Persisted identifier.
    pub id: IntegrationId,
    /// Persisted owner.
    pub owner: AccountId,
    /// Persisted festival scope.
    pub scope: FestivalId,
    /// Persisted credentials.
    pub credentials: Credentials,
    /// Persisted status.
    pub status: IntegrationStatus,
    /// Persisted webhook URL.
    pub webhook_url: Option<String>,
    /// Persisted last error.
    pub last_error: Option<String>,
    /// Persisted last error timestamp.
    pub last_error_at: Option<DateTime<Utc>>,
    /// Persisted webhook receipt timestamp.
    pub last_webhook_received_at: Option<DateTime<Utc>>,
    /// Persisted group sync timestamp.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Persisted preferences.
    pub notification_preferences: NotificationPreferences,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Stored row version.
    pub version: i64,
}

impl Integration {
    /// Creates a `draft` integration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::EmptyChannelId`] or
    /// [`IntegrationDomainError::EmptyChannelSecret`] for blank credentials.
    pub fn new(params: NewIntegration, clock: &impl Clock) -> Result<Self, IntegrationDomainError> {
        let channel_id = params.channel_id.trim().to_owned();
        if channel_id.is_empty() {
            return Err(IntegrationDomainError::EmptyChannelId);
        }
        if params.channel_secret.is_empty() {
            return Err(IntegrationDomainError::EmptyChannelSecret);
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: IntegrationId::new(),
            owner: params.owner,
            scope: params.scope,
            credentials: Credentials::new(channel_id, params.channel_secret),
            status: IntegrationStatus::Draft,
            webhook_url: params.webhook_url,
            last_error: None,
            last_error_at: None,
            last_webhook_received_at: None,
            last_sync_at: None,
            notification_preferences: params.preferences,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        })
    }

    /// Reconstructs an integration from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedIntegrationData) -> Self {
        Self {
            id: data.id,
            owner: data.owner,
            scope: data.scope,
            credentials: data.credentials,
            status: data.status,
            webhook_url: data.webhook_url,
            last_error: data.last_error,
            last_error_at: data.last_error_at,
            last_webhook_received_at: data.last_webhook_received_at,
            last_sync_at: data.last_sync_at,
            notification_preferences: data.notification_preferences,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    /// Returns the integration identifier.
    #[must_use]
    pub const fn id(&self) -> IntegrationId {
        self.id
    }

    /// Returns the owning account.
    #[must_use]
    pub const fn owner(&self) -> AccountId {
        self.owner
    }

    /// Returns the festival scope.
    #[must_use]
    pub const fn scope(&self) -> FestivalId {
        self.scope
    }

    /// Returns the platform channel identifier.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        self.credentials.channel_id()
    }

    /// Returns the secret webhook signatures are verified against.
    #[must_use]
    pub const fn signing_secret(&self) -> &SecretValue {
        self.credentials.channel_secret()
    }

    /// Returns the credentials for the outbound platform caller.
    #[must_use]
    pub(crate) const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> IntegrationStatus {
        self.status
    }

    /// Returns whether outbound notifications may be sent.
    #[must_use]
    pub const fn can_send(&self) -> bool {
        self.status.can_send()
    }

    /// Returns whether an access token is held.
    #[must_use]
    pub const fn has_access_token(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    /// Returns the registered webhook URL.
    #[must_use]
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    /// Returns the last recorded error.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns when the last error was recorded.
    #[must_use]
    pub const fn last_error_at(&self) -> Option<DateTime<Utc>> {
        self.last_error_at
    }

    /// Returns when the last webhook arrived.
    #[must_use]
    pub const fn last_webhook_received_at(&self) -> Option<DateTime<Utc>> {
        self.last_webhook_received_at
    }

    /// Returns when groups were last synchronized.
    #[must_use]
    pub const fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    /// Returns the notification preferences.
    #[must_use]
    pub const fn notification_preferences(&self) -> &NotificationPreferences {
        &self.notification_preferences
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the stored row version this copy was loaded at.
    ///
    /// Versioned writes succeed only while the stored row still carries
    /// this version.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Marks a successful connection test.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidStatusTransition`] when the
    /// current status cannot move to `connected`.
    pub fn mark_connected(&mut self, clock: &impl Clock) -> Result<(), IntegrationDomainError> {
        self.transition_to(IntegrationStatus::Connected)?;
        self.clear_error();
        self.touch(clock);
        Ok(())
    }

    /// Stores tokens from a successful credential exchange and connects.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidStatusTransition`] when the
    /// current status cannot move to `connected`.
    pub fn authenticate(
        &mut self,
        grant: TokenGrant,
        clock: &impl Clock,
    ) -> Result<(), IntegrationDomainError> {
        self.transition_to(IntegrationStatus::Connected)?;
        let now = clock.utc();
        self.credentials.apply_grant(grant, now);
        self.clear_error();
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed outbound operation.
    ///
    /// The status becomes `error`, except that an `inactive` integration
    /// keeps its status and only records the message.
    pub fn record_failure(&mut self, error: impl Into<String>, clock: &impl Clock) {
        let now = clock.utc();
        if self.status != IntegrationStatus::Inactive {
            self.status = IntegrationStatus::Error;
        }
        self.last_error = Some(error.into());
        self.last_error_at = Some(now);
        self.updated_at = now;
    }

    /// Disconnects the integration and wipes its tokens.
    ///
    /// The channel secret is kept so webhooks received afterwards can still
    /// be verified and audited.
    pub fn disconnect(&mut self, clock: &impl Clock) {
        self.status = IntegrationStatus::Inactive;
        self.credentials.wipe_tokens();
        self.webhook_url = None;
        self.touch(clock);
    }

    /// Records a completed group synchronization.
    pub fn record_sync(&mut self, clock: &impl Clock) {
        let now = clock.utc();
        self.last_sync_at = Some(now);
        self.updated_at = now;
    }

    /// Records that a verified webhook arrived at `at`.
    ///
    /// The receipt stamp is written on its own and does not advance the
    /// version.
    pub const fn record_webhook_received(&mut self, at: DateTime<Utc>) {
        self.last_webhook_received_at = Some(at);
    }

    /// Returns the copy stored by a successful versioned write.
    #[must_use]
    pub fn into_next_version(mut self) -> Self {
        self.version = self.version.saturating_add(1);
        self
    }

    /// Replaces the notification preferences.
    pub fn update_preferences(&mut self, preferences: NotificationPreferences, clock: &impl Clock) {
        self.notification_preferences = preferences;
        self.touch(clock);
    }

    fn transition_to(&mut self, target: IntegrationStatus) -> Result<(), IntegrationDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(IntegrationDomainError::InvalidStatusTransition {
                integration_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        self.last_error_at = None;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
