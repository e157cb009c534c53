//! Port contracts for festival task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services and
//! by the messaging pipeline.

pub mod repository;

pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
