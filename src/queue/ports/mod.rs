//! Port abstractions for the work queue.

mod queue;

pub use queue::{JobQueue, QueueError, QueueResult};
