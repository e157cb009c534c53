//! Application services for task lifecycle orchestration.

mod lifecycle;

pub use lifecycle::{
    CompletionOutcome, CreateTaskRequest, TaskLifecycleError, TaskLifecycleResult,
    TaskLifecycleService,
};
