//! Diesel schema for inbound message persistence.

diesel::table! {
    /// Inbound chat messages, unique per integration and platform id.
    messages (id) {
        /// Internal message identifier.
        id -> Uuid,
        /// Receiving integration.
        integration_id -> Uuid,
        /// Platform-assigned message identifier.
        #[max_length = 100]
        platform_message_id -> Varchar,
        /// Platform group or room identifier.
        #[max_length = 100]
        group_ref -> Nullable<Varchar>,
        /// Platform sender identifier.
        #[max_length = 100]
        sender_id -> Nullable<Varchar>,
        /// Message text.
        text -> Text,
        /// Platform timestamp.
        sent_at -> Timestamptz,
        /// Receipt timestamp.
        received_at -> Timestamptz,
        /// Whether processing completed.
        is_processed -> Bool,
        /// Classified intent.
        #[max_length = 20]
        intent_type -> Nullable<Varchar>,
        /// Created or completed task.
        task_ref -> Nullable<Uuid>,
        /// Failed processing attempts.
        processing_attempts -> Int4,
        /// Most recent processing error.
        last_error -> Nullable<Text>,
        /// Whether retries have been exhausted.
        permanently_failed -> Bool,
    }
}
