//! Tasklink: chat-driven task management for festival committees.
//!
//! Members post in their committee's chat group; the bot turns recognised
//! messages into tasks and task completions, then reports back to the group.
//!
//! # Architecture
//!
//! Tasklink follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP, memory)
//!
//! A webhook request is verified, normalized and enqueued by [`webhook`];
//! the [`queue`] worker pool hands each job to [`pipeline`], which stores
//! the [`message`], classifies it, applies the [`task`] change and queues a
//! [`notification`]. The [`integration`] context owns channel credentials,
//! connection state and chat groups.
//!
//! # Modules
//!
//! - [`integration`]: Channel credentials, connection state machine, groups
//! - [`message`]: Idempotent inbound message store and intent classifier
//! - [`task`]: Chat-created task lifecycle
//! - [`notification`]: Outbound rendering, quiet hours and dispatch
//! - [`queue`]: Durable leased job queue and worker pool
//! - [`pipeline`]: Job routing and message-to-task synchronization
//! - [`webhook`]: Signature verification, normalization and HTTP routes
//! - [`config`] and [`telemetry`]: Runtime configuration and logging

pub mod clock;
pub mod config;
pub mod integration;
pub mod message;
pub mod notification;
pub mod persistence;
pub mod pipeline;
pub mod queue;
pub mod task;
pub mod telemetry;
pub mod webhook;
