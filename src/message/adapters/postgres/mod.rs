//! `PostgreSQL` adapter for inbound message persistence.

mod models;
mod repository;
mod schema;

pub use repository::PostgresMessageRepository;
