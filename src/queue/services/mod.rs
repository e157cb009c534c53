//! Worker pool draining the job queue.

mod worker;

pub use worker::{HandlerError, JobHandler, WorkerPool, WorkerPoolConfig, WorkerPoolHandle};
