//! Voice gateway - signed URLs, provider webhooks and connectivity checks.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{ProviderError, VoiceProvider};

/// Signed conversation URL handed to the browser client
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    #[schema(example = "wss://api.elevenlabs.io/v1/convai/conversation?agent_id=...")]
    pub signed_url: String,
    #[schema(value_type = Option<Object>)]
    pub expires_at: Option<Value>,
    pub agent_id: String,
}

/// Result of the provider connectivity check
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    #[schema(value_type = Option<Object>)]
    pub subscription: Option<Value>,
    pub is_connected: bool,
}

/// Webhook event types we react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    ConversationStarted,
    ConversationEnded,
    Other(String),
}

impl From<&str> for WebhookEventKind {
    fn from(value: &str) -> Self {
        match value {
            "conversation.started" => WebhookEventKind::ConversationStarted,
            "conversation.ended" => WebhookEventKind::ConversationEnded,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }
}

/// Provider webhook payload; only the two identifiers are required.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event_type: Option<String>,
    pub conversation_id: Option<String>,
    pub agent_id: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<Value>,
}

/// Voice gateway trait for dependency injection.
#[async_trait]
pub trait VoiceService: Send + Sync {
    /// Obtain a signed conversation URL for the configured agent
    async fn get_signed_url(&self) -> AppResult<SignedUrl>;

    /// Interpret a raw webhook body
    fn handle_webhook(&self, body: &[u8]) -> AppResult<WebhookEventKind>;

    /// Check that the configured key reaches the provider
    async fn test_connection(&self) -> AppResult<ConnectionStatus>;
}

/// VoiceService over any VoiceProvider.
pub struct VoiceGateway {
    provider: Arc<dyn VoiceProvider>,
    api_key: Option<String>,
    agent_id: Option<String>,
}

impl VoiceGateway {
    pub fn new(provider: Arc<dyn VoiceProvider>, config: &Config) -> Self {
        Self {
            provider,
            api_key: config.elevenlabs_api_key().map(str::to_string),
            agent_id: config.elevenlabs_agent_id.clone(),
        }
    }
}

#[async_trait]
impl VoiceService for VoiceGateway {
    async fn get_signed_url(&self) -> AppResult<SignedUrl> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::operational(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Eleven Labs API key is not configured",
            )
        })?;
        let agent_id = self.agent_id.as_deref().ok_or_else(|| {
            AppError::operational(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Eleven Labs Agent ID is not configured",
            )
        })?;

        let reply = match self.provider.signed_url(api_key, agent_id).await {
            Ok(reply) => reply,
            Err(ProviderError::Status {
                status,
                reason,
                body,
            }) => {
                tracing::error!(status, reason = %reason, body = ?body, "Eleven Labs API error");
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return Err(AppError::operational(
                    status,
                    format!("Failed to get signed URL: {}", reason),
                ));
            }
            Err(err @ ProviderError::Transport(_)) => {
                tracing::error!(error = %err, "Error in get-signed-url endpoint");
                return Err(AppError::operational(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate signed URL",
                ));
            }
        };

        let signed_url = reply.signed_url.filter(|url| !url.is_empty()).ok_or_else(|| {
            AppError::operational(
                StatusCode::INTERNAL_SERVER_ERROR,
                "No signed URL in the response",
            )
        })?;

        tracing::info!(agent_id, "Signed URL obtained successfully");
        Ok(SignedUrl {
            signed_url,
            expires_at: reply.expires_at,
            agent_id: agent_id.to_string(),
        })
    }

    fn handle_webhook(&self, body: &[u8]) -> AppResult<WebhookEventKind> {
        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(format!("Invalid webhook payload: {}", e)))?;

        let (Some(event_type), Some(conversation_id)) = (
            event.event_type.filter(|s| !s.is_empty()),
            event.conversation_id.filter(|s| !s.is_empty()),
        ) else {
            return Err(AppError::bad_request("Invalid webhook payload"));
        };

        tracing::info!(
            event_type = %event_type,
            conversation_id = %conversation_id,
            agent_id = ?event.agent_id,
            user_id = ?event.user_id,
            timestamp = ?event.timestamp,
            "Eleven Labs webhook received"
        );

        let kind = WebhookEventKind::from(event_type.as_str());
        match &kind {
            WebhookEventKind::ConversationStarted => {
                tracing::info!(conversation_id = %conversation_id, "Conversation started");
            }
            WebhookEventKind::ConversationEnded => {
                tracing::info!(conversation_id = %conversation_id, "Conversation ended");
            }
            WebhookEventKind::Other(other) => {
                tracing::info!(event_type = %other, "Unhandled webhook event type");
            }
        }

        Ok(kind)
    }

    async fn test_connection(&self) -> AppResult<ConnectionStatus> {
        let failed = || {
            AppError::operational(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Eleven Labs API connection test failed",
            )
        };

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            tracing::error!("Eleven Labs API connection test failed: API key is not configured");
            failed()
        })?;

        let reply = self.provider.user(api_key).await.map_err(|e| {
            tracing::error!(error = %e, "Eleven Labs API connection test failed");
            failed()
        })?;

        tracing::info!("Eleven Labs API connection test successful");
        Ok(ConnectionStatus {
            subscription: reply.subscription,
            is_connected: true,
        })
    }
}
