//! Repository ports for integrations and their groups.

use crate::integration::domain::{Group, Integration, IntegrationId, IntegrationStatus};
use chrono::{DateTime, Utc};
use crate::task::domain::FestivalId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for integration repository operations.
pub type IntegrationRepositoryResult<T> = Result<T, IntegrationRepositoryError>;

/// Integration persistence contract.
///
/// Implementations enforce uniqueness of `(owner, scope)` and of the
/// platform channel identifier.
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    /// Stores a new integration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::DuplicateScope`] or
    /// [`IntegrationRepositoryError::DuplicateChannel`] when a uniqueness
    /// rule is violated.
    async fn store(&self, integration: &Integration) -> IntegrationRepositoryResult<()>;

    /// Persists changes to an existing integration.
    ///
    /// The write only applies while the stored row still carries
    /// [`Integration::version`]; it then advances the version and returns
    /// the stored copy. The webhook receipt stamp is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::NotFound`] when the integration
    /// does not exist, or [`IntegrationRepositoryError::Conflict`] when it
    /// was changed since it was loaded.
    async fn update(&self, integration: &Integration) -> IntegrationRepositoryResult<Integration>;

    /// Stamps the receipt of a verified webhook without touching any other
    /// column.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::NotFound`] when the integration
    /// does not exist.
    async fn record_webhook_received(
        &self,
        id: IntegrationId,
        at: DateTime<Utc>,
    ) -> IntegrationRepositoryResult<()>;

    /// Finds an integration by identifier.
    async fn find_by_id(&self, id: IntegrationId)
    -> IntegrationRepositoryResult<Option<Integration>>;

    /// Finds the integration bound to a platform channel.
    async fn find_by_channel_id(
        &self,
        channel_id: &str,
    ) -> IntegrationRepositoryResult<Option<Integration>>;

    /// Lists integrations with the given status.
    async fn list_by_status(
        &self,
        status: IntegrationStatus,
    ) -> IntegrationRepositoryResult<Vec<Integration>>;
}

/// Errors returned by integration repository implementations.
#[derive(Debug, Clone, Error)]
pub enum IntegrationRepositoryError {
    /// The owner already has an integration for this festival.
    #[error("an integration already exists for festival {0}")]
    DuplicateScope(FestivalId),

    /// Another integration is bound to the same platform channel.
    #[error("channel {0} is already bound to an integration")]
    DuplicateChannel(String),

    /// The integration was not found.
    #[error("integration not found: {0}")]
    NotFound(IntegrationId),

    /// The integration changed after it was loaded.
    #[error("integration {0} was modified concurrently")]
    Conflict(IntegrationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl IntegrationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for group repository operations.
pub type GroupRepositoryResult<T> = Result<T, GroupRepositoryError>;

/// Group persistence contract.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Inserts or replaces a group keyed by
    /// `(integration_id, platform_group_id)`.
    ///
    /// Returns the stored group, which keeps the existing identifier when a
    /// row for the key already exists.
    async fn upsert(&self, group: &Group) -> GroupRepositoryResult<Group>;

    /// Finds a group by its platform identifier.
    async fn find_by_platform_id(
        &self,
        integration_id: IntegrationId,
        platform_group_id: &str,
    ) -> GroupRepositoryResult<Option<Group>>;

    /// Lists all groups of an integration, oldest first.
    async fn list_by_integration(
        &self,
        integration_id: IntegrationId,
    ) -> GroupRepositoryResult<Vec<Group>>;
}

/// Errors returned by group repository implementations.
#[derive(Debug, Clone, Error)]
pub enum GroupRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl GroupRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
