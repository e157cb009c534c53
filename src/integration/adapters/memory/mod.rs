//! In-memory integration and group repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::integration::{
    domain::{Group, Integration, IntegrationId, IntegrationStatus, PersistedGroupData},
    ports::{
        GroupRepository, GroupRepositoryError, GroupRepositoryResult, IntegrationRepository,
        IntegrationRepositoryError, IntegrationRepositoryResult,
    },
};

/// Thread-safe in-memory integration repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIntegrationRepository {
    state: Arc<RwLock<HashMap<IntegrationId, Integration>>>,
}

impl InMemoryIntegrationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn integration_poisoned<T>(err: std::sync::PoisonError<T>) -> IntegrationRepositoryError {
    IntegrationRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn store(&self, integration: &Integration) -> IntegrationRepositoryResult<()> {
        let mut state = self.state.write().map_err(integration_poisoned)?;
        for existing in state.values() {
            if existing.owner() == integration.owner() && existing.scope() == integration.scope() {
                return Err(IntegrationRepositoryError::DuplicateScope(
                    integration.scope(),
                ));
            }
            if existing.channel_id() == integration.channel_id() {
                return Err(IntegrationRepositoryError::DuplicateChannel(
                    integration.channel_id().to_owned(),
                ));
            }
        }
        state.insert(integration.id(), integration.clone());
        Ok(())
    }

    async fn update(&self, integration: &Integration) -> IntegrationRepositoryResult<Integration> {
        let mut state = self.state.write().map_err(integration_poisoned)?;
        let Some(stored) = state.get_mut(&integration.id()) else {
            return Err(IntegrationRepositoryError::NotFound(integration.id()));
        };
        if stored.version() != integration.version() {
            return Err(IntegrationRepositoryError::Conflict(integration.id()));
        }
        let mut next = integration.clone().into_next_version();
        if let Some(at) = stored.last_webhook_received_at() {
            next.record_webhook_received(at);
        }
        *stored = next.clone();
        Ok(next)
    }

    async fn record_webhook_received(
        &self,
        id: IntegrationId,
        at: DateTime<Utc>,
    ) -> IntegrationRepositoryResult<()> {
        let mut state = self.state.write().map_err(integration_poisoned)?;
        let Some(stored) = state.get_mut(&id) else {
            return Err(IntegrationRepositoryError::NotFound(id));
        };
        stored.record_webhook_received(at);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: IntegrationId,
    ) -> IntegrationRepositoryResult<Option<Integration>> {
        let state = self.state.read().map_err(integration_poisoned)?;
        Ok(state.get(&id).cloned())
    }

    async fn find_by_channel_id(
        &self,
        channel_id: &str,
    ) -> IntegrationRepositoryResult<Option<Integration>> {
        let state = self.state.read().map_err(integration_poisoned)?;
        Ok(state
            .values()
            .find(|integration| integration.channel_id() == channel_id)
            .cloned())
    }

    async fn list_by_status(
        &self,
        status: IntegrationStatus,
    ) -> IntegrationRepositoryResult<Vec<Integration>> {
        let state = self.state.read().map_err(integration_poisoned)?;
        let mut matching: Vec<Integration> = state
            .values()
            .filter(|integration| integration.status() == status)
            .cloned()
            .collect();
        matching.sort_by_key(|integration| (integration.created_at(), integration.id()));
        Ok(matching)
    }
}

/// Thread-safe in-memory group repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGroupRepository {
    state: Arc<RwLock<HashMap<(IntegrationId, String), Group>>>,
}

impl InMemoryGroupRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn group_poisoned<T>(err: std::sync::PoisonError<T>) -> GroupRepositoryError {
    GroupRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn upsert(&self, group: &Group) -> GroupRepositoryResult<Group> {
        let mut state = self.state.write().map_err(group_poisoned)?;
        let key = (group.integration_id(), group.platform_group_id().to_owned());
        let stored = match state.get(&key) {
            Some(existing) => Group::from_persisted(PersistedGroupData {
                id: existing.id(),
                integration_id: group.integration_id(),
                platform_group_id: group.platform_group_id().to_owned(),
                display_name: group.display_name().map(str::to_owned),
                is_active: group.is_active(),
                member_count: group.member_count(),
                last_activity_at: group.last_activity_at(),
                created_at: existing.created_at(),
                updated_at: group.updated_at(),
            }),
            None => group.clone(),
        };
        state.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_by_platform_id(
        &self,
        integration_id: IntegrationId,
        platform_group_id: &str,
    ) -> GroupRepositoryResult<Option<Group>> {
        let state = self.state.read().map_err(group_poisoned)?;
        Ok(state
            .get(&(integration_id, platform_group_id.to_owned()))
            .cloned())
    }

    async fn list_by_integration(
        &self,
        integration_id: IntegrationId,
    ) -> GroupRepositoryResult<Vec<Group>> {
        let state = self.state.read().map_err(group_poisoned)?;
        let mut groups: Vec<Group> = state
            .values()
            .filter(|group| group.integration_id() == integration_id)
            .cloned()
            .collect();
        groups.sort_by_key(|group| (group.created_at(), group.id()));
        Ok(groups)
    }
}
