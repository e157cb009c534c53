//! Domain model for festival task lifecycle management.
//!
//! Tasks are scoped to a festival and may originate from chat messages. All
//! infrastructure concerns stay outside the domain boundary.

mod error;
mod ids;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::{FestivalId, TaskId, TaskTitle};
pub use task::{NewTask, PersistedTaskData, Task, TaskStatus};
