//! Notification rendering, dispatch and reminder scheduling.

mod dispatcher;
mod formatter;
mod reminder;

pub use dispatcher::{DispatchSettings, NotificationDispatcher};
pub use formatter::{FormatError, MessageFormatter};
pub use reminder::{ReminderError, ReminderService};
