//! Adapter implementations for inbound message persistence.

pub mod memory;
pub mod postgres;
