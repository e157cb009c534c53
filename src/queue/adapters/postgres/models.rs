//! Diesel row models for queued jobs.

use super::schema::jobs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row and insert model for jobs.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    /// Job identifier.
    pub id: uuid::Uuid,
    /// Payload discriminator.
    pub kind: String,
    /// Serialized payload.
    pub payload: serde_json::Value,
    /// Lifecycle state.
    pub status: String,
    /// Claims made so far.
    pub attempts: i32,
    /// Earliest claim time.
    pub available_at: DateTime<Utc>,
    /// Lease start.
    pub locked_at: Option<DateTime<Utc>>,
    /// Lease holder.
    pub locked_by: Option<String>,
    /// Error from the last failed attempt.
    pub last_error: Option<String>,
    /// Enqueue time.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}
