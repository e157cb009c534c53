//! Diesel row models for integration and group persistence.

use super::schema::{chat_groups, integrations};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result and insert row for integrations.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = integrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IntegrationRow {
    /// Internal identifier.
    pub id: uuid::Uuid,
    /// Owning account.
    pub owner_id: uuid::Uuid,
    /// Festival scope.
    pub festival_id: uuid::Uuid,
    /// Platform channel identifier.
    pub channel_id: String,
    /// Channel secret.
    pub channel_secret: String,
    /// Current access token.
    pub access_token: Option<String>,
    /// Current refresh token.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Connection status.
    pub status: String,
    /// Registered webhook URL.
    pub webhook_url: Option<String>,
    /// Last recorded error.
    pub last_error: Option<String>,
    /// Last error timestamp.
    pub last_error_at: Option<DateTime<Utc>>,
    /// Last webhook receipt.
    pub last_webhook_received_at: Option<DateTime<Utc>>,
    /// Last group sync.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Notification preferences document.
    pub notification_preferences: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Row version.
    pub version: i64,
}

/// Columns a versioned integration update may change.
///
/// Identity, ownership, the creation time and the webhook receipt stamp are
/// never rewritten by a full update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = integrations)]
#[diesel(treat_none_as_null = true)]
pub struct IntegrationChanges {
    /// Channel secret.
    pub channel_secret: String,
    /// Current access token.
    pub access_token: Option<String>,
    /// Current refresh token.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Connection status.
    pub status: String,
    /// Registered webhook URL.
    pub webhook_url: Option<String>,
    /// Last recorded error.
    pub last_error: Option<String>,
    /// Last error timestamp.
    pub last_error_at: Option<DateTime<Utc>>,
    /// Last group sync.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Notification preferences document.
    pub notification_preferences: serde_json::Value,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result and insert row for chat groups.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = chat_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupRow {
    /// Internal identifier.
    pub id: uuid::Uuid,
    /// Owning integration.
    pub integration_id: uuid::Uuid,
    /// Platform group identifier.
    pub platform_group_id: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Whether the bot is still a member.
    pub is_active: bool,
    /// Member count.
    pub member_count: i32,
    /// Last message timestamp.
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
