//! Terminal error rendering.
//!
//! Every [`AppError`](crate::errors::AppError) response carries an
//! [`ErrorReport`]; this layer logs it and, in development, swaps the body for
//! one that exposes the underlying fault.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::AppState;
use crate::errors::{status_label, ErrorReport};

pub async fn error_handler(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if report.status.is_server_error() {
        tracing::error!(
            %method,
            %path,
            status = report.status.as_u16(),
            operational = report.operational,
            message = %report.message,
            detail = %report.detail,
            "Request failed"
        );
    } else {
        tracing::warn!(
            %method,
            %path,
            status = report.status.as_u16(),
            message = %report.message,
            "Request rejected"
        );
    }

    if state.config.environment.is_production() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    let body = Json(json!({
        "status": status_label(report.status),
        "message": report.message,
        "error": report.detail,
    }));

    let mut developer = (parts, body).into_response();
    developer.extensions_mut().insert(report);
    developer
}
