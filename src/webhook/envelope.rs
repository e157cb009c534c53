//! Wire format of the platform's webhook payload.
//!
//! Fields the pipeline does not use are ignored; fields that may be absent
//! on some event types are optional so one malformed event does not reject
//! the whole payload.

use serde::Deserialize;

/// Top-level webhook body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookEnvelope {
    /// Channel id of the receiving bot.
    #[serde(default)]
    pub destination: Option<String>,
    /// Delivered events.
    #[serde(default)]
    pub events: Vec<WireEvent>,
}

impl WebhookEnvelope {
    /// Parses a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the body is not a valid envelope.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// One platform event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireEvent {
    /// Event type, e.g. `message` or `join`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Message body for `message` events.
    #[serde(default)]
    pub message: Option<WireMessage>,
    /// Where the event happened.
    #[serde(default)]
    pub source: Option<WireSource>,
    /// Event time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Members who joined, for `memberJoined`.
    #[serde(default)]
    pub joined: Option<WireMembers>,
    /// Members who left, for `memberLeft`.
    #[serde(default)]
    pub left: Option<WireMembers>,
}

/// Message part of a `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireMessage {
    /// Platform message id.
    #[serde(default)]
    pub id: Option<String>,
    /// Message type, e.g. `text` or `image`.
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    /// Text for `text` messages.
    #[serde(default)]
    pub text: Option<String>,
}

/// Event source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSource {
    /// `group`, `room` or `user`.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Group id for group sources.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Room id for room sources.
    #[serde(default)]
    pub room_id: Option<String>,
    /// Sending user, when disclosed.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Member list of a membership event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireMembers {
    /// Members; only the count is used.
    #[serde(default)]
    pub members: Vec<serde_json::Value>,
}
