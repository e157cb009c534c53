//! Notification payloads and dispatch outcomes.

mod event;
mod outcome;

pub use crate::integration::domain::NotificationKind;
pub use event::{NotificationEvent, NotificationTarget, OutboundNotification};
pub use outcome::{DispatchOutcome, SuppressionReason};
