//! Keeps the group table in line with membership events and the platform.

use crate::integration::{
    domain::{Group, Integration, IntegrationId, MembershipChange, SecretValue},
    ports::{GroupRepository, GroupRepositoryError, MessagingPlatform, PlatformError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Service-level errors for group synchronization.
#[derive(Debug, Error)]
pub enum GroupSyncError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] GroupRepositoryError),
    /// A platform call failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for group synchronization.
pub type GroupSyncResult<T> = Result<T, GroupSyncError>;

/// Counts reported by a full synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Groups refreshed from the platform.
    pub refreshed: usize,
    /// Inactive groups skipped.
    pub skipped: usize,
}

/// Group membership bookkeeping.
#[derive(Clone)]
pub struct GroupSyncService<G, P, C>
where
    G: GroupRepository,
    P: MessagingPlatform,
    C: Clock + Send + Sync,
{
    groups: Arc<G>,
    platform: Arc<P>,
    clock: Arc<C>,
}

impl<G, P, C> GroupSyncService<G, P, C>
where
    G: GroupRepository,
    P: MessagingPlatform,
    C: Clock + Send + Sync,
{
    /// Creates a new group sync service.
    #[must_use]
    pub const fn new(groups: Arc<G>, platform: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            groups,
            platform,
            clock,
        }
    }

    /// Applies a membership event to the group, creating it if unknown.
    ///
    /// When the bot joins and the integration can call the platform, the
    /// group's name and member count are fetched; a failed fetch is logged
    /// and the group is stored without them.
    ///
    /// # Errors
    ///
    /// Returns [`GroupSyncError::Repository`] when persistence fails.
    pub async fn apply_membership(
        &self,
        integration: &Integration,
        platform_group_id: &str,
        change: MembershipChange,
    ) -> GroupSyncResult<Group> {
        let mut group = self.load_or_new(integration.id(), platform_group_id).await?;
        group.apply(change, &*self.clock);

        if change == MembershipChange::BotJoined
            && let Some(token) = sendable_token(integration)
        {
            match self.fetch_summary(token, platform_group_id).await {
                Ok((name, count)) => group.refresh_summary(name, count, &*self.clock),
                Err(err) => warn!(
                    integration_id = %integration.id(),
                    group = platform_group_id,
                    error = %err,
                    "group summary fetch failed"
                ),
            }
        }

        Ok(self.groups.upsert(&group).await?)
    }

    /// Records message activity in a group, creating the group if unknown.
    ///
    /// # Errors
    ///
    /// Returns [`GroupSyncError::Repository`] when persistence fails.
    pub async fn touch_activity(
        &self,
        integration_id: IntegrationId,
        platform_group_id: &str,
        at: DateTime<Utc>,
    ) -> GroupSyncResult<Group> {
        let mut group = self.load_or_new(integration_id, platform_group_id).await?;
        group.touch_activity(at, &*self.clock);
        Ok(self.groups.upsert(&group).await?)
    }

    /// Lists the groups the bot is still a member of.
    ///
    /// # Errors
    ///
    /// Returns [`GroupSyncError::Repository`] when lookup fails.
    pub async fn active_groups(&self, integration_id: IntegrationId) -> GroupSyncResult<Vec<Group>> {
        let groups = self.groups.list_by_integration(integration_id).await?;
        Ok(groups.into_iter().filter(Group::is_active).collect())
    }

    /// Refreshes name and member count of every active group.
    ///
    /// Stops at the first platform failure so the caller can record it on
    /// the integration; groups refreshed before the failure stay updated.
    ///
    /// # Errors
    ///
    /// Returns [`GroupSyncError::Platform`] on the first failed call, or
    /// repository errors.
    pub async fn sync_groups(
        &self,
        integration_id: IntegrationId,
        access_token: &SecretValue,
    ) -> GroupSyncResult<SyncReport> {
        let mut report = SyncReport::default();
        for mut group in self.groups.list_by_integration(integration_id).await? {
            if !group.is_active() {
                report.skipped += 1;
                continue;
            }
            let (name, count) = self
                .fetch_summary(access_token, group.platform_group_id())
                .await?;
            group.refresh_summary(name, count, &*self.clock);
            self.groups.upsert(&group).await?;
            report.refreshed += 1;
        }
        debug!(%integration_id, refreshed = report.refreshed, skipped = report.skipped, "groups synchronized");
        Ok(report)
    }

    async fn load_or_new(
        &self,
        integration_id: IntegrationId,
        platform_group_id: &str,
    ) -> GroupSyncResult<Group> {
        let existing = self
            .groups
            .find_by_platform_id(integration_id, platform_group_id)
            .await?;
        Ok(existing.unwrap_or_else(|| Group::new(integration_id, platform_group_id, &*self.clock)))
    }

    async fn fetch_summary(
        &self,
        token: &SecretValue,
        platform_group_id: &str,
    ) -> Result<(Option<String>, u32), PlatformError> {
        let summary = self.platform.group_summary(token, platform_group_id).await?;
        let count = self
            .platform
            .group_member_count(token, platform_group_id)
            .await?;
        Ok((summary.group_name, count))
    }
}

fn sendable_token(integration: &Integration) -> Option<&SecretValue> {
    if integration.can_send() {
        integration.credentials().access_token()
    } else {
        None
    }
}
