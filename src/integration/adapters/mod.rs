//! Adapter implementations for the integration context.

pub mod http;
pub mod memory;
pub mod postgres;
pub mod runtime;
