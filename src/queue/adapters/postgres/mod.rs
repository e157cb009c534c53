//! `PostgreSQL` adapter for the durable work queue.

mod models;
mod queue;
mod schema;

pub use queue::PostgresJobQueue;
