//! Application route configuration.

use axum::{
    extract::{DefaultBodyLimit, OriginalUri},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{auth_routes, call_routes, health, voice_routes};
use super::middleware::{error_handler, protect, rate_limit_middleware, security_headers};
use super::openapi::ApiDoc;
use super::AppState;
use crate::config::{API_PREFIX, MAX_BODY_BYTES};

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes(state.clone()))
        // Every call route requires a session
        .nest(
            "/calls",
            call_routes().route_layer(middleware::from_fn_with_state(state.clone(), protect)),
        )
        .merge(voice_routes(state.clone()));

    Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(API_PREFIX, api)
        .fallback(not_found)
        // Innermost first: errors are rendered before limits and headers apply
        .layer(middleware::from_fn_with_state(state.clone(), error_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(security_headers))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON 404 for unmatched routes
async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": format!("Cannot find {} on this server", uri.path()),
        })),
    )
}
