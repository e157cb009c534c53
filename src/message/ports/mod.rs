//! Port definitions for inbound message persistence.

mod repository;

pub use repository::{
    InsertOutcome, MessageRepository, MessageRepositoryError, MessageRepositoryResult,
};
