//! Classified intent of an inbound chat message.

use super::ParseIntentTypeError;
use crate::task::domain::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted intent category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    /// The message asks for a new task.
    TaskCreation,
    /// The message reports an open task as done.
    TaskCompletion,
    /// Ordinary chatter.
    None,
    /// A marker or keyword was present but nothing actionable matched.
    Unrecognized,
}

impl IntentType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreation => "task_creation",
            Self::TaskCompletion => "task_completion",
            Self::None => "none",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IntentType {
    type Error = ParseIntentTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "task_creation" => Ok(Self::TaskCreation),
            "task_completion" => Ok(Self::TaskCompletion),
            "none" => Ok(Self::None),
            "unrecognized" => Ok(Self::Unrecognized),
            _ => Err(ParseIntentTypeError(value.to_owned())),
        }
    }
}

/// Classifier result with the data needed to act on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Create a task with this title.
    TaskCreation {
        /// Title extracted after the creation marker.
        title: String,
    },
    /// Complete the referenced open task.
    TaskCompletion {
        /// Task selected by title match.
        task_id: TaskId,
    },
    /// Nothing to do.
    None,
    /// Recognizable but not actionable.
    Unrecognized,
}

impl Intent {
    /// Returns the persisted category for this intent.
    #[must_use]
    pub const fn intent_type(&self) -> IntentType {
        match self {
            Self::TaskCreation { .. } => IntentType::TaskCreation,
            Self::TaskCompletion { .. } => IntentType::TaskCompletion,
            Self::None => IntentType::None,
            Self::Unrecognized => IntentType::Unrecognized,
        }
    }
}
