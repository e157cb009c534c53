//! Outbound notifications for chat-driven task changes.
//!
//! Notifications travel through the work queue as
//! [`domain::OutboundNotification`] payloads. The
//! [`services::NotificationDispatcher`] decides whether each one may be sent
//! (connection status, preferences, quiet hours), renders its text and
//! pushes it to the platform with bounded retries. Dispatch never fails the
//! task synchronization that produced it.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
