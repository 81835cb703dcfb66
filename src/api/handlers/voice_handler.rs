//! Voice provider endpoints: signed URLs, webhooks and a connectivity check.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    middleware,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::api::middleware::{protect, restrict_to, CurrentUser};
use crate::api::AppState;
use crate::config::MAX_WEBHOOK_BODY_BYTES;
use crate::domain::UserRole;
use crate::errors::{AppError, AppResult};
use crate::services::{ConnectionStatus, SignedUrl};
use crate::types::ApiResponse;

pub const WEBHOOK_RECEIVED: &str = "Webhook received";
pub const WEBHOOK_FAILED: &str = "Webhook processed with errors";
pub const CONNECTION_SUCCESSFUL: &str = "Eleven Labs API connection successful";

/// Webhook acknowledgement. Always sent with 200 so the provider does not retry.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub message: &'static str,
}

/// Create voice routes
pub fn voice_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/get-signed-url", get(get_signed_url))
        .route(
            "/elevenlabs/webhook",
            post(webhook).layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES)),
        )
        .route(
            "/elevenlabs/test-connection",
            get(test_connection).route_layer(middleware::from_fn_with_state(state, protect)),
        )
}

/// Obtain a signed conversation URL for the configured agent
#[utoipa::path(
    get,
    path = "/api/get-signed-url",
    tag = "Voice",
    responses(
        (status = 200, description = "Signed URL issued", body = SignedUrl),
        (status = 500, description = "Provider not configured or unreachable")
    )
)]
pub async fn get_signed_url(State(state): State<AppState>) -> AppResult<ApiResponse<SignedUrl>> {
    let signed = state.voice_service.get_signed_url().await?;
    Ok(ApiResponse::success(signed))
}

/// Receive a provider event
#[utoipa::path(
    post,
    path = "/api/elevenlabs/webhook",
    tag = "Voice",
    request_body(content = String, content_type = "application/json"),
    responses((status = 200, description = "Event acknowledged, with or without errors"))
)]
pub async fn webhook(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> axum::Json<WebhookAck> {
    let processed = match body {
        Ok(body) => state.voice_service.handle_webhook(&body).map(|_| ()),
        Err(rejection) => Err(AppError::bad_request(rejection.body_text())),
    };

    let ack = match processed {
        Ok(()) => WebhookAck {
            status: "success",
            message: WEBHOOK_RECEIVED,
        },
        Err(e) => {
            tracing::error!(error = %e, "Eleven Labs webhook processing failed");
            WebhookAck {
                status: "error",
                message: WEBHOOK_FAILED,
            }
        }
    };

    axum::Json(ack)
}

/// Check the provider credentials (admin only)
#[utoipa::path(
    get,
    path = "/api/elevenlabs/test-connection",
    tag = "Voice",
    responses(
        (status = 200, description = "Provider reachable", body = ConnectionStatus),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Eleven Labs API connection test failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn test_connection(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<ApiResponse<ConnectionStatus>> {
    restrict_to(&current_user, &[UserRole::Admin])?;

    let status = state.voice_service.test_connection().await?;
    Ok(ApiResponse::with_message(status, CONNECTION_SUCCESSFUL))
}
