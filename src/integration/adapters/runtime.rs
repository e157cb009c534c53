//! In-process messaging platform for tests and local runs.
//!
//! Tokens issued by this adapter stay valid until [`expire_tokens`] is
//! called; scripted failures are consumed one per push.
//!
//! [`expire_tokens`]: InMemoryMessagingPlatform::expire_tokens

use crate::integration::{
    domain::{SecretValue, TokenGrant},
    ports::{GroupSummary, MessagingPlatform, PlatformError, PlatformResult},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

/// A message accepted by [`InMemoryMessagingPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipient group, room or user.
    pub to: String,
    /// Message body.
    pub text: String,
}

/// In-memory messaging platform adapter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessagingPlatform {
    state: Arc<RwLock<InMemoryPlatformState>>,
}

#[derive(Debug, Default)]
struct InMemoryPlatformState {
    sent: Vec<SentMessage>,
    push_failures: VecDeque<PlatformError>,
    issue_failure: Option<PlatformError>,
    valid_tokens: HashSet<String>,
    issued: u32,
    groups: HashMap<String, (Option<String>, u32)>,
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> PlatformError {
    PlatformError::Transient(format!("platform state lock poisoned: {err}"))
}

impl InMemoryMessagingPlatform {
    /// Creates a platform with no groups and no issued tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every accepted message in send order.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transient`] when the lock is poisoned.
    pub fn sent(&self) -> PlatformResult<Vec<SentMessage>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.sent.clone())
    }

    /// Returns how many tokens have been issued.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transient`] when the lock is poisoned.
    pub fn issued_tokens(&self) -> PlatformResult<u32> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.issued)
    }

    /// Queues a failure returned by the next push.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transient`] when the lock is poisoned.
    pub fn fail_next_push(&self, failure: PlatformError) -> PlatformResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.push_failures.push_back(failure);
        Ok(())
    }

    /// Makes every token exchange fail with `failure` until cleared.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transient`] when the lock is poisoned.
    pub fn fail_token_exchange(&self, failure: Option<PlatformError>) -> PlatformResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.issue_failure = failure;
        Ok(())
    }

    /// Invalidates every issued token.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transient`] when the lock is poisoned.
    pub fn expire_tokens(&self) -> PlatformResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.valid_tokens.clear();
        Ok(())
    }

    /// Registers a group the platform knows about.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transient`] when the lock is poisoned.
    pub fn add_group(
        &self,
        group_id: impl Into<String>,
        name: impl Into<String>,
        member_count: u32,
    ) -> PlatformResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state
            .groups
            .insert(group_id.into(), (Some(name.into()), member_count));
        Ok(())
    }

    fn ensure_valid(state: &InMemoryPlatformState, token: &SecretValue) -> PlatformResult<()> {
        if state.valid_tokens.contains(token.expose()) {
            Ok(())
        } else {
            Err(PlatformError::TokenExpired)
        }
    }

    fn group(state: &InMemoryPlatformState, group_id: &str) -> PlatformResult<(Option<String>, u32)> {
        state
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| PlatformError::Rejected {
                status: 404,
                message: format!("unknown group {group_id}"),
            })
    }
}

#[async_trait]
impl MessagingPlatform for InMemoryMessagingPlatform {
    async fn push_message(
        &self,
        access_token: &SecretValue,
        to: &str,
        text: &str,
    ) -> PlatformResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(failure) = state.push_failures.pop_front() {
            return Err(failure);
        }
        Self::ensure_valid(&state, access_token)?;
        state.sent.push(SentMessage {
            to: to.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn verify_token(&self, access_token: &SecretValue) -> PlatformResult<()> {
        let state = self.state.read().map_err(poisoned)?;
        Self::ensure_valid(&state, access_token)
    }

    async fn issue_token(
        &self,
        channel_id: &str,
        _channel_secret: &SecretValue,
    ) -> PlatformResult<TokenGrant> {
        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(failure) = state.issue_failure.clone() {
            return Err(failure);
        }
        state.issued = state.issued.saturating_add(1);
        let token = format!("{channel_id}-token-{}", state.issued);
        state.valid_tokens.insert(token.clone());
        Ok(TokenGrant {
            access_token: SecretValue::new(token),
            refresh_token: None,
            expires_in_secs: Some(2_592_000),
        })
    }

    async fn group_summary(
        &self,
        access_token: &SecretValue,
        group_id: &str,
    ) -> PlatformResult<GroupSummary> {
        let state = self.state.read().map_err(poisoned)?;
        Self::ensure_valid(&state, access_token)?;
        let (group_name, _) = Self::group(&state, group_id)?;
        Ok(GroupSummary {
            group_id: group_id.to_owned(),
            group_name,
        })
    }

    async fn group_member_count(
        &self,
        access_token: &SecretValue,
        group_id: &str,
    ) -> PlatformResult<u32> {
        let state = self.state.read().map_err(poisoned)?;
        Self::ensure_valid(&state, access_token)?;
        let (_, count) = Self::group(&state, group_id)?;
        Ok(count)
    }
}
