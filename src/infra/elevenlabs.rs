//! ElevenLabs conversational-AI API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::{ELEVENLABS_API_KEY_HEADER, ELEVENLABS_TIMEOUT_SECONDS};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Failure talking to the voice provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("provider returned {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: Option<Value>,
    },

    /// Network, TLS, timeout or body decoding fault
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Body of `GET /v1/convai/conversation/get_signed_url`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SignedUrlReply {
    pub signed_url: Option<String>,
    pub expires_at: Option<Value>,
}

/// Body of `GET /v1/user` (only the parts we surface)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserReply {
    pub subscription: Option<Value>,
}

/// Voice-agent provider operations.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Request a signed websocket URL for a conversation with `agent_id`.
    async fn signed_url(&self, api_key: &str, agent_id: &str)
        -> Result<SignedUrlReply, ProviderError>;

    /// Fetch the account the key belongs to.
    async fn user(&self, api_key: &str) -> Result<UserReply, ProviderError>;
}

/// reqwest-backed VoiceProvider
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ElevenLabsClient {
    /// Create a client for the API at `base_url`.
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ELEVENLABS_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        api_key: &str,
    ) -> Result<T, ProviderError> {
        let response = request
            .header(ELEVENLABS_API_KEY_HEADER, api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VoiceProvider for ElevenLabsClient {
    async fn signed_url(
        &self,
        api_key: &str,
        agent_id: &str,
    ) -> Result<SignedUrlReply, ProviderError> {
        let request = self
            .http_client
            .get(self.url("/v1/convai/conversation/get_signed_url"))
            .query(&[("agent_id", agent_id)]);

        self.get_json(request, api_key).await
    }

    async fn user(&self, api_key: &str) -> Result<UserReply, ProviderError> {
        let request = self.http_client.get(self.url("/v1/user"));
        self.get_json(request, api_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = ElevenLabsClient::new("https://api.elevenlabs.io/").unwrap();
        assert_eq!(client.url("/v1/user"), "https://api.elevenlabs.io/v1/user");
    }

    #[test]
    fn test_signed_url_reply_is_lenient() {
        let reply: SignedUrlReply = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert_eq!(reply, SignedUrlReply::default());

        let reply: SignedUrlReply =
            serde_json::from_str(r#"{"signed_url": "wss://x", "expires_at": 1700000000}"#)
                .unwrap();
        assert_eq!(reply.signed_url.as_deref(), Some("wss://x"));
    }
}
