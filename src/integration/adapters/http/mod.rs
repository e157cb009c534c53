//! `reqwest` adapter for a LINE-style messaging API.
//!
//! Status mapping: `401` is [`PlatformError::TokenExpired`]; `5xx`, `429`,
//! timeouts and connection failures are [`PlatformError::Transient`]; any
//! other non-success status is [`PlatformError::Rejected`].

use crate::integration::{
    domain::{SecretValue, TokenGrant},
    ports::{GroupSummary, MessagingPlatform, PlatformError, PlatformResult},
};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Messaging platform adapter backed by HTTP.
#[derive(Debug, Clone)]
pub struct HttpMessagingPlatform {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupSummaryResponse {
    group_id: String,
    group_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberCountResponse {
    count: u32,
}

#[derive(Debug, Serialize)]
struct AccessTokenForm<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

impl HttpMessagingPlatform {
    /// Builds a client for `api_base` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] when the TLS backend cannot be initialized.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tasklink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        access_token: &SecretValue,
        path: &str,
    ) -> PlatformResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(access_token.expose())
            .send()
            .await
            .map_err(transport_error)?;
        let checked = check_status(response).await?;
        checked.json::<T>().await.map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> PlatformError {
    if err.is_decode() {
        return PlatformError::Rejected {
            status: err.status().map_or(200, |status| status.as_u16()),
            message: format!("unexpected response body: {err}"),
        };
    }
    PlatformError::Transient(err.to_string())
}

async fn check_status(response: Response) -> PlatformResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    debug!(status = status.as_u16(), %message, "platform call failed");
    Err(classify_status(status, message))
}

fn classify_status(status: StatusCode, message: String) -> PlatformError {
    if status == StatusCode::UNAUTHORIZED {
        PlatformError::TokenExpired
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PlatformError::Transient(format!("status {}: {message}", status.as_u16()))
    } else {
        PlatformError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl MessagingPlatform for HttpMessagingPlatform {
    async fn push_message(
        &self,
        access_token: &SecretValue,
        to: &str,
        text: &str,
    ) -> PlatformResult<()> {
        let payload = json!({
            "to": to,
            "messages": [{ "type": "text", "text": text }],
        });
        let response = self
            .http
            .post(self.url("/v2/bot/message/push"))
            .bearer_auth(access_token.expose())
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn verify_token(&self, access_token: &SecretValue) -> PlatformResult<()> {
        let response = self
            .http
            .get(self.url("/v2/bot/info"))
            .bearer_auth(access_token.expose())
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn issue_token(
        &self,
        channel_id: &str,
        channel_secret: &SecretValue,
    ) -> PlatformResult<TokenGrant> {
        let form = AccessTokenForm {
            grant_type: "client_credentials",
            client_id: channel_id,
            client_secret: channel_secret.expose(),
        };
        let response = self
            .http
            .post(self.url("/v2/oauth/accessToken"))
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let token: AccessTokenResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(TokenGrant {
            access_token: SecretValue::new(token.access_token),
            refresh_token: None,
            expires_in_secs: token.expires_in,
        })
    }

    async fn group_summary(
        &self,
        access_token: &SecretValue,
        group_id: &str,
    ) -> PlatformResult<GroupSummary> {
        let summary: GroupSummaryResponse = self
            .get_json(access_token, &format!("/v2/bot/group/{group_id}/summary"))
            .await?;
        Ok(GroupSummary {
            group_id: summary.group_id,
            group_name: summary.group_name,
        })
    }

    async fn group_member_count(
        &self,
        access_token: &SecretValue,
        group_id: &str,
    ) -> PlatformResult<u32> {
        let count: MemberCountResponse = self
            .get_json(
                access_token,
                &format!("/v2/bot/group/{group_id}/members/count"),
            )
            .await?;
        Ok(count.count)
    }
}
