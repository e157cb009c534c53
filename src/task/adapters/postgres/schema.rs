//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Festival task records.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Owning festival.
        festival_id -> Uuid,
        /// Task title.
        #[max_length = 100]
        title -> Varchar,
        /// Task lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Whether the task was created from a chat message.
        created_via_messaging -> Bool,
        /// Chat messages that created or transitioned the task.
        source_messages -> Array<Uuid>,
        /// Optional deadline.
        due_at -> Nullable<Timestamptz>,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
