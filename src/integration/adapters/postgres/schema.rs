//! Diesel schema for integration and group persistence.

diesel::table! {
    /// Chat-platform integrations.
    integrations (id) {
        /// Internal identifier.
        id -> Uuid,
        /// Owning account.
        owner_id -> Uuid,
        /// Festival scope.
        festival_id -> Uuid,
        /// Platform channel identifier.
        #[max_length = 100]
        channel_id -> Varchar,
        /// Channel secret.
        channel_secret -> Text,
        /// Current access token.
        access_token -> Nullable<Text>,
        /// Current refresh token.
        refresh_token -> Nullable<Text>,
        /// Access token expiry.
        token_expires_at -> Nullable<Timestamptz>,
        /// Connection status.
        #[max_length = 20]
        status -> Varchar,
        /// Registered webhook URL.
        webhook_url -> Nullable<Text>,
        /// Last recorded error.
        last_error -> Nullable<Text>,
        /// Last error timestamp.
        last_error_at -> Nullable<Timestamptz>,
        /// Last webhook receipt.
        last_webhook_received_at -> Nullable<Timestamptz>,
        /// Last group sync.
        last_sync_at -> Nullable<Timestamptz>,
        /// Notification preferences document.
        notification_preferences -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Row version for compare-and-swap updates.
        version -> Int8,
    }
}

diesel::table! {
    /// Chat groups bound to integrations.
    chat_groups (id) {
        /// Internal identifier.
        id -> Uuid,
        /// Owning integration.
        integration_id -> Uuid,
        /// Platform group identifier.
        #[max_length = 100]
        platform_group_id -> Varchar,
        /// Display name.
        display_name -> Nullable<Text>,
        /// Whether the bot is still a member.
        is_active -> Bool,
        /// Member count.
        member_count -> Int4,
        /// Last message timestamp.
        last_activity_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(chat_groups -> integrations (integration_id));
diesel::allow_tables_to_appear_in_same_query!(integrations, chat_groups);
