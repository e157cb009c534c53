//! Chat groups bound to an integration.

use super::{GroupId, IntegrationId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Membership change observed through the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum MembershipChange {
    /// The bot was added to the group.
    BotJoined,
    /// The bot was removed from the group.
    BotLeft,
    /// Members joined.
    MembersJoined(u32),
    /// Members left.
    MembersLeft(u32),
}

/// A platform group or room the integration's bot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    integration_id: IntegrationId,
    platform_group_id: String,
    display_name: Option<String>,
    is_active: bool,
    member_count: u32,
    last_activity_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedGroupData {
    /// Persisted identifier.
    pub id: GroupId,
    /// Owning integration.
    pub integration_id: IntegrationId,
    /// Platform group identifier.
    pub platform_group_id: String,
    /// Display name reported by the platform.
    pub display_name: Option<String>,
    /// Whether the bot is still a member.
    pub is_active: bool,
    /// Member count reported by the platform.
    pub member_count: u32,
    /// Timestamp of the most recent message.
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates an active group with no known members.
    #[must_use]
    pub fn new(
        integration_id: IntegrationId,
        platform_group_id: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: GroupId::new(),
            integration_id,
            platform_group_id: platform_group_id.into(),
            display_name: None,
            is_active: true,
            member_count: 0,
            last_activity_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a group from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedGroupData) -> Self {
        Self {
            id: data.id,
            integration_id: data.integration_id,
            platform_group_id: data.platform_group_id,
            display_name: data.display_name,
            is_active: data.is_active,
            member_count: data.member_count,
            last_activity_at: data.last_activity_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the group identifier.
    #[must_use]
    pub const fn id(&self) -> GroupId {
        self.id
    }

    /// Returns the owning integration.
    #[must_use]
    pub const fn integration_id(&self) -> IntegrationId {
        self.integration_id
    }

    /// Returns the platform group identifier.
    #[must_use]
    pub fn platform_group_id(&self) -> &str {
        &self.platform_group_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns whether the bot is still a member.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the member count.
    #[must_use]
    pub const fn member_count(&self) -> u32 {
        self.member_count
    }

    /// Returns when the last message was seen.
    #[must_use]
    pub const fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity_at
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

    /// Applies a membership change.
    pub fn apply(&mut self, change: MembershipChange, clock: &impl Clock) {
        match change {
            MembershipChange::BotJoined => self.is_active = true,
            MembershipChange::BotLeft => self.is_active = false,
            MembershipChange::MembersJoined(count) => {
                self.member_count = self.member_count.saturating_add(count);
            }
            MembershipChange::MembersLeft(count) => {
                self.member_count = self.member_count.saturating_sub(count);
            }
        }
        self.updated_at = clock.utc();
    }

    /// Replaces the platform-reported summary.
    pub fn refresh_summary(
        &mut self,
        display_name: Option<String>,
        member_count: u32,
        clock: &impl Clock,
    ) {
        if display_name.is_some() {
            self.display_name = display_name;
        }
        self.member_count = member_count;
        self.updated_at = clock.utc();
    }

    /// Records message activity at `at`; older timestamps are ignored.
    pub fn touch_activity(&mut self, at: DateTime<Utc>, clock: &impl Clock) {
        if self.last_activity_at.is_some_and(|previous| previous >= at) {
            return;
        }
        self.last_activity_at = Some(at);
        self.updated_at = clock.utc();
    }
}
