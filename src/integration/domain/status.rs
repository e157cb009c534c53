//! Connection status of an integration.

use super::ParseIntegrationStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status of a chat-platform integration.
///
/// `draft → connected → error → inactive`; `connected` is the only status
/// in which outbound notifications are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    /// Created, credentials not yet validated.
    Draft,
    /// Credentials validated and usable.
    Connected,
    /// The last outbound operation failed.
    Error,
    /// Disconnected by the owner.
    Inactive,
}

impl IntegrationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Inactive => "inactive",
        }
    }

    /// Returns whether outbound sends are allowed.
    #[must_use]
    pub const fn can_send(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Draft | Self::Connected | Self::Error,
                Self::Connected | Self::Error | Self::Inactive
            ) | (Self::Inactive, Self::Connected | Self::Inactive)
        )
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IntegrationStatus {
    type Error = ParseIntegrationStatusError;

    fn try_from(value: &str) -> Result<Self, ParseIntegrationStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "connected" => Ok(Self::Connected),
            "error" => Ok(Self::Error),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseIntegrationStatusError(value.to_owned())),
        }
    }
}
