//! Durable work queue and the worker pool that drains it.
//!
//! The webhook handler enqueues one [`domain::Job`] per normalized event and
//! returns immediately. Workers claim jobs under a lease, so a crashed
//! worker's job becomes claimable again once its lease expires. Failed jobs
//! are retried with exponential backoff until their attempt budget is spent,
//! after which they stay in the `failed` state for inspection.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
