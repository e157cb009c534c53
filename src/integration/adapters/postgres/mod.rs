//! `PostgreSQL` adapters for integration and group persistence.

mod group_repository;
mod integration_repository;
mod models;
mod schema;

pub use group_repository::PostgresGroupRepository;
pub use integration_repository::PostgresIntegrationRepository;
