//! Turns platform envelopes into pipeline events.

use super::envelope::{WebhookEnvelope, WireEvent, WireMembers, WireSource};
use crate::integration::domain::MembershipChange;
use crate::message::domain::PlatformMessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where an event happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventSource {
    /// A group chat.
    Group {
        /// Platform group id.
        group_id: String,
        /// Sender, when disclosed.
        user_id: Option<String>,
    },
    /// A multi-person room.
    Room {
        /// Platform room id.
        room_id: String,
        /// Sender, when disclosed.
        user_id: Option<String>,
    },
    /// A one-to-one chat.
    User {
        /// Platform user id.
        user_id: String,
    },
}

impl EventSource {
    /// Returns the group or room id, if any.
    #[must_use]
    pub fn group_ref(&self) -> Option<&str> {
        match self {
            Self::Group { group_id, .. } => Some(group_id),
            Self::Room { room_id, .. } => Some(room_id),
            Self::User { .. } => None,
        }
    }

    /// Returns the sending user, if disclosed.
    #[must_use]
    pub fn sender_id(&self) -> Option<&str> {
        match self {
            Self::Group { user_id, .. } | Self::Room { user_id, .. } => user_id.as_deref(),
            Self::User { user_id } => Some(user_id),
        }
    }

    /// Returns where a reply should be pushed.
    #[must_use]
    pub fn reply_target(&self) -> &str {
        match self {
            Self::Group { group_id, .. } => group_id,
            Self::Room { room_id, .. } => room_id,
            Self::User { user_id } => user_id,
        }
    }
}

/// A chat message ready for the message pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Where the message was posted.
    pub source: EventSource,
    /// Platform message id; the idempotency key.
    pub message_id: PlatformMessageId,
    /// Message text; empty for non-text messages.
    pub text: String,
    /// Platform timestamp in epoch milliseconds.
    pub timestamp_millis: i64,
}

impl InboundEvent {
    /// Returns the platform timestamp.
    #[must_use]
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}

/// A change in group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    /// What changed.
    pub change: MembershipChange,
    /// Group or room affected.
    pub source: EventSource,
    /// Platform timestamp in epoch milliseconds.
    pub timestamp_millis: i64,
}

/// Result of normalizing one wire event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
    /// A chat message.
    Message(InboundEvent),
    /// A membership change.
    Membership(MembershipEvent),
    /// An event type the pipeline does not act on.
    Ignored {
        /// Platform event type.
        event_type: String,
    },
}

/// Normalizes every event in `envelope`.
///
/// Events missing required fields are skipped with a warning; the rest of
/// the payload is still processed.
#[must_use]
pub fn normalize(envelope: &WebhookEnvelope) -> Vec<NormalizedEvent> {
    envelope
        .events
        .iter()
        .filter_map(|event| {
            let normalized = normalize_event(event);
            if normalized.is_none() {
                warn!(event_type = %event.event_type, "webhook event missing required fields; skipped");
            }
            normalized
        })
        .collect()
}

fn normalize_event(event: &WireEvent) -> Option<NormalizedEvent> {
    match event.event_type.as_str() {
        "message" => normalize_message(event).map(NormalizedEvent::Message),
        "join" => membership(event, MembershipChange::BotJoined),
        "leave" => membership(event, MembershipChange::BotLeft),
        "memberJoined" => {
            membership(event, MembershipChange::MembersJoined(member_count(event.joined.as_ref())))
        }
        "memberLeft" => {
            membership(event, MembershipChange::MembersLeft(member_count(event.left.as_ref())))
        }
        other => {
            debug!(event_type = other, "webhook event ignored");
            Some(NormalizedEvent::Ignored {
                event_type: other.to_owned(),
            })
        }
    }
}

fn normalize_message(event: &WireEvent) -> Option<InboundEvent> {
    let message = event.message.as_ref()?;
    let message_id = PlatformMessageId::new(message.id.as_deref()?).ok()?;
    let text = if message.message_type.as_deref() == Some("text") {
        message.text.clone().unwrap_or_default()
    } else {
        String::new()
    };
    Some(InboundEvent {
        source: source(event.source.as_ref()?)?,
        message_id,
        text,
        timestamp_millis: event.timestamp?,
    })
}

fn membership(event: &WireEvent, change: MembershipChange) -> Option<NormalizedEvent> {
    let resolved = source(event.source.as_ref()?)?;
    resolved.group_ref()?;
    Some(NormalizedEvent::Membership(MembershipEvent {
        change,
        source: resolved,
        timestamp_millis: event.timestamp?,
    }))
}

fn source(wire: &WireSource) -> Option<EventSource> {
    match wire.source_type.as_str() {
        "group" => Some(EventSource::Group {
            group_id: wire.group_id.clone()?,
            user_id: wire.user_id.clone(),
        }),
        "room" => Some(EventSource::Room {
            room_id: wire.room_id.clone()?,
            user_id: wire.user_id.clone(),
        }),
        "user" => Some(EventSource::User {
            user_id: wire.user_id.clone()?,
        }),
        _ => None,
    }
}

fn member_count(members: Option<&WireMembers>) -> u32 {
    members.map_or(0, |list| u32::try_from(list.members.len()).unwrap_or(u32::MAX))
}
