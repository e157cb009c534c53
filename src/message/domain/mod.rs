//! Domain types for inbound chat messages.
//!
//! This module contains pure domain types with no infrastructure dependencies:
//! the stored message aggregate, its identifiers and the rule-based intent
//! classifier.

mod classifier;
mod error;
mod ids;
mod intent;
mod message;

pub use classifier::{COMPLETION_KEYWORDS, classify, normalize_for_matching};
pub use error::{MessageDomainError, ParseIntentTypeError};
pub use ids::{MessageId, PlatformMessageId};
pub use intent::{Intent, IntentType};
pub use message::{InboundMessage, NewInboundMessage, PersistedInboundMessage};
