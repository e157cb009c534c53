//! Job handling: the message pipeline and its collaborators.
//!
//! [`MessageSynchronizer`] turns a normalized chat message into a stored
//! message, a classified intent and a task change. [`JobProcessor`] routes
//! every queued job kind to the service that handles it and maps failures
//! to queue retries.

mod processor;
mod synchronizer;

pub use processor::JobProcessor;
pub use synchronizer::{MessageSynchronizer, SyncError, SyncOutcome, SyncSettings};

#[cfg(test)]
mod tests;
