//! Diesel schema for queued jobs.

diesel::table! {
    /// Durable work queue.
    jobs (id) {
        /// Job identifier.
        id -> Uuid,
        /// Payload discriminator.
        #[max_length = 40]
        kind -> Varchar,
        /// Serialized payload.
        payload -> Jsonb,
        /// Lifecycle state.
        #[max_length = 20]
        status -> Varchar,
        /// Claims made so far.
        attempts -> Int4,
        /// Earliest claim time.
        available_at -> Timestamptz,
        /// Lease start.
        locked_at -> Nullable<Timestamptz>,
        /// Lease holder.
        #[max_length = 100]
        locked_by -> Nullable<Varchar>,
        /// Error from the last failed attempt.
        last_error -> Nullable<Text>,
        /// Enqueue time.
        created_at -> Timestamptz,
        /// Last state change.
        updated_at -> Timestamptz,
    }
}
