//! Rule-based intent classification for inbound chat text.
//!
//! Classification is pure: the same text and the same set of open tasks
//! always produce the same [`Intent`]. Rules are applied in order:
//!
//! 1. A creation marker at the start of the text (`タスク:`, `TODO:`,
//!    `task:`, `【タスク】`, `#task`) yields [`Intent::TaskCreation`] with the
//!    remainder as title, or [`Intent::Unrecognized`] if the remainder is
//!    empty.
//! 2. A completion keyword yields [`Intent::TaskCompletion`] for the most
//!    recently created open task whose title appears in the text, or
//!    [`Intent::Unrecognized`] when no title matches.
//! 3. Anything else is [`Intent::None`].
//!
//! # Examples
//!
//! ```
//! use tasklink::message::domain::{Intent, classify};
//!
//! let intent = classify("タスク: 会場設営をする", &[]);
//! assert_eq!(
//!     intent,
//!     Intent::TaskCreation { title: "会場設営をする".to_owned() }
//! );
//! assert_eq!(classify("おはようございます", &[]), Intent::None);
//! ```

use super::Intent;
use crate::task::domain::{Task, TaskTitle};
use regex::Regex;
use std::sync::LazyLock;

/// Completion keywords, compared after normalization.
pub const COMPLETION_KEYWORDS: [&str; 8] = [
    "完了", "終わった", "終了", "済み", "できた", "done", "finished", "completed",
];

static CREATION_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?:(?:タスク|todo|task)\s*[:：]|【タスク】|#task(?:\s*[:：])?(?:\s|$))(.*)$")
        .ok()
});

/// Classifies `text` against the festival's open tasks.
#[must_use]
pub fn classify(text: &str, open_tasks: &[Task]) -> Intent {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Intent::None;
    }

    if let Some(remainder) = creation_remainder(trimmed) {
        let truncated: String = remainder.trim().chars().take(TaskTitle::MAX_CHARS).collect();
        let title = truncated.trim();
        if title.is_empty() {
            return Intent::Unrecognized;
        }
        return Intent::TaskCreation {
            title: title.to_owned(),
        };
    }

    let normalized = normalize_for_matching(trimmed);
    if !has_completion_keyword(&normalized) {
        return Intent::None;
    }

    open_tasks
        .iter()
        .filter(|task| task.status().is_open())
        .filter(|task| {
            let title = normalize_for_matching(task.title().as_str());
            !title.is_empty() && normalized.contains(&title)
        })
        .max_by_key(|task| (task.created_at(), task.id()))
        .map_or(Intent::Unrecognized, |task| Intent::TaskCompletion {
            task_id: task.id(),
        })
}

fn creation_remainder(text: &str) -> Option<&str> {
    let marker = CREATION_MARKER.as_ref()?;
    marker
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|remainder| remainder.as_str())
}

fn has_completion_keyword(normalized: &str) -> bool {
    COMPLETION_KEYWORDS
        .iter()
        .any(|keyword| normalized.contains(keyword))
}

/// Folds text for substring matching.
///
/// Full-width ASCII is folded to half-width, whitespace is removed and the
/// result is lowercased.
#[must_use]
pub fn normalize_for_matching(text: &str) -> String {
    text.chars()
        .map(fold_full_width)
        .filter(|character| !character.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn fold_full_width(character: char) -> char {
    match character {
        '\u{FF01}'..='\u{FF5E}' => {
            char::from_u32(u32::from(character) - 0xFEE0).unwrap_or(character)
        }
        '\u{3000}' => ' ',
        _ => character,
    }
}
