//! Outbound messaging-platform port.

use crate::integration::domain::{SecretValue, TokenGrant};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Group metadata reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    /// Platform group identifier.
    pub group_id: String,
    /// Display name.
    pub group_name: Option<String>,
}

/// Authenticated calls to the chat platform's API.
///
/// Implementations bound every call with a timeout and report timeouts as
/// [`PlatformError::Transient`].
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Pushes a text message to a group, room or user.
    async fn push_message(
        &self,
        access_token: &SecretValue,
        to: &str,
        text: &str,
    ) -> PlatformResult<()>;

    /// Checks that an access token is valid.
    async fn verify_token(&self, access_token: &SecretValue) -> PlatformResult<()>;

    /// Exchanges channel credentials for an access token.
    async fn issue_token(
        &self,
        channel_id: &str,
        channel_secret: &SecretValue,
    ) -> PlatformResult<TokenGrant>;

    /// Fetches a group's summary.
    async fn group_summary(
        &self,
        access_token: &SecretValue,
        group_id: &str,
    ) -> PlatformResult<GroupSummary>;

    /// Fetches a group's member count.
    async fn group_member_count(
        &self,
        access_token: &SecretValue,
        group_id: &str,
    ) -> PlatformResult<u32>;
}

/// Errors returned by platform adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The access token was rejected as expired or revoked.
    #[error("access token expired or revoked")]
    TokenExpired,

    /// Network failure, timeout or server-side error; safe to retry.
    #[error("transient platform failure: {0}")]
    Transient(String),

    /// The platform rejected the request.
    #[error("platform rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },
}

impl PlatformError {
    /// Returns whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
