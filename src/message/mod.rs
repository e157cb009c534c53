//! Inbound chat message storage and intent classification.
//!
//! Every message event delivered by the chat platform is recorded exactly
//! once per platform message identifier, classified, and then marked
//! processed. The unique key `(integration_id, platform_message_id)` is the
//! only concurrency control the pipeline relies on.
//!
//! # Architecture
//!
//! - **Domain**: [`domain::InboundMessage`], [`domain::Intent`] and the
//!   pure [`domain::classify`] function
//! - **Ports**: [`ports::MessageRepository`]
//! - **Adapters**: [`adapters::memory::InMemoryMessageRepository`],
//!   [`adapters::postgres::PostgresMessageRepository`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
