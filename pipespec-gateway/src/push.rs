//! Out-of-band delivery of slow answers.

use async_trait::async_trait;
use pipespec_common::util::truncate_with_ellipsis;
use serde_json::json;
use std::time::Duration;

/// LINE rejects text messages longer than this.
const LINE_TEXT_LIMIT: usize = 5000;

/// Result type for push operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Push channel error type.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// A channel that can deliver a text message to a user outside the
/// request/response cycle.
#[async_trait]
pub trait PushChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn push_text(&self, to: &str, text: &str) -> ChannelResult<()>;
}

/// LINE Messaging API push client.
pub struct LinePushClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl LinePushClient {
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            access_token: access_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PushChannel for LinePushClient {
    fn name(&self) -> &'static str {
        "line"
    }

    async fn push_text(&self, to: &str, text: &str) -> ChannelResult<()> {
        if to.is_empty() {
            return Err(ChannelError::InvalidMessage("empty recipient".into()));
        }
        if text.trim().is_empty() {
            return Err(ChannelError::InvalidMessage("empty text".into()));
        }

        let url = format!("{}/v2/bot/message/push", self.base_url);
        let body = json!({
            "to": to,
            "messages": [{
                "type": "text",
                "text": truncate_with_ellipsis(text, LINE_TEXT_LIMIT)
            }]
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ChannelError::Auth(error),
                429 => ChannelError::RateLimited,
                _ => ChannelError::SendFailed(format!("LINE API error ({status}): {error}")),
            });
        }

        tracing::info!(recipient = %to, "LINE push message sent");
        Ok(())
    }
}
