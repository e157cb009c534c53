//! Dispatch results.

use std::fmt;

/// Why a notification was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    /// The integration is not `connected`.
    NotConnected,
    /// The owner switched this notification kind off.
    Disabled,
    /// The send time fell inside the quiet window.
    QuietHours,
    /// The target resolved to no recipients.
    NoRecipients,
}

impl SuppressionReason {
    /// Returns the canonical name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Disabled => "disabled",
            Self::QuietHours => "quiet_hours",
            Self::NoRecipients => "no_recipients",
        }
    }
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a dispatch attempt. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The message reached every recipient.
    Sent {
        /// Number of recipients the message was pushed to.
        delivered: usize,
    },
    /// The message was deliberately dropped.
    Suppressed(SuppressionReason),
    /// Sending failed after retries; the failure is recorded on the
    /// integration.
    Failed {
        /// Last error observed.
        error: String,
    },
}

impl DispatchOutcome {
    /// Returns whether at least one message was pushed.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}
