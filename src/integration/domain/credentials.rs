//! Platform credentials held by an integration.
//!
//! Secret material is wrapped in [`SecretValue`], which is wiped from memory
//! when dropped or explicitly zeroized and never printed by `Debug`.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wraps secret material.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the secret for the single call that needs it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

/// Access token issued by the platform's credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Short-lived access token.
    pub access_token: SecretValue,
    /// Refresh token, when the platform issues one.
    pub refresh_token: Option<SecretValue>,
    /// Token lifetime in seconds, when known.
    pub expires_in_secs: Option<i64>,
}

/// Channel credentials and the tokens derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub(super) channel_id: String,
    pub(super) channel_secret: SecretValue,
    pub(super) access_token: Option<SecretValue>,
    pub(super) refresh_token: Option<SecretValue>,
    pub(super) token_expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Creates credentials that have not been exchanged for tokens yet.
    #[must_use]
    pub const fn new(channel_id: String, channel_secret: SecretValue) -> Self {
        Self {
            channel_id,
            channel_secret,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
        }
    }

    /// Reconstructs persisted credentials.
    #[must_use]
    pub const fn from_parts(
        channel_id: String,
        channel_secret: SecretValue,
        access_token: Option<SecretValue>,
        refresh_token: Option<SecretValue>,
        token_expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            channel_id,
            channel_secret,
            access_token,
            refresh_token,
            token_expires_at,
        }
    }

    /// Returns the platform channel identifier.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Returns the channel secret.
    #[must_use]
    pub const fn channel_secret(&self) -> &SecretValue {
        &self.channel_secret
    }

    /// Returns the current access token.
    #[must_use]
    pub const fn access_token(&self) -> Option<&SecretValue> {
        self.access_token.as_ref()
    }

    /// Returns the current refresh token.
    #[must_use]
    pub const fn refresh_token(&self) -> Option<&SecretValue> {
        self.refresh_token.as_ref()
    }

    /// Returns when the access token expires.
    #[must_use]
    pub const fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expires_at
    }

    pub(super) fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = Some(grant.access_token);
        if grant.refresh_token.is_some() {
            self.refresh_token = grant.refresh_token;
        }
        self.token_expires_at = grant
            .expires_in_secs
            .and_then(Duration::try_seconds)
            .map(|lifetime| now + lifetime);
    }

    pub(super) fn wipe_tokens(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
        self.token_expires_at = None;
    }
}
