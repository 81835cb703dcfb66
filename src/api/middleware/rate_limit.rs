//! Rate limiting middleware over the in-process limiter.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::AppState;
use crate::config::RATE_LIMIT_EXEMPT_PATH;
use crate::infra::RateLimitInfo;

pub const RATE_LIMITED: &str = "Too many requests, please try again later.";

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Rate limit error response
#[derive(Debug)]
pub struct RateLimitError {
    pub limit: u32,
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(self.retry_after),
        );
        insert_limit_headers(
            &mut headers,
            &RateLimitInfo {
                limit: self.limit,
                remaining: 0,
                reset_after: self.retry_after,
            },
        );

        (
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            Json(json!({ "status": "error", "message": RATE_LIMITED })),
        )
            .into_response()
    }
}

fn insert_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(info.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(info.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(info.reset_after));
}

/// Extract client identifier for rate limiting.
///
/// The socket peer is the client unless it is one of `trusted_proxies`.
/// Behind a trusted proxy, `X-Forwarded-For` is walked from the right and the
/// first untrusted hop wins; `X-Real-IP` is the fallback.
pub fn client_identifier(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
    else {
        return "unknown".to_string();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let headers = request.headers();
    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        for hop in forwarded.rsplit(',').map(str::trim) {
            match hop.parse::<IpAddr>() {
                Ok(ip) if trusted_proxies.contains(&ip) => continue,
                Ok(ip) => return ip.to_string(),
                Err(_) => break,
            }
        }
    }

    headers
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
        .to_string()
}

/// Fixed-window limit per client IP. Webhook deliveries are exempt.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if request.uri().path().contains(RATE_LIMIT_EXEMPT_PATH) {
        return Ok(next.run(request).await);
    }

    let client_id = client_identifier(&request, &state.config.trusted_proxies);
    let info = state.rate_limiter.check(&client_id).map_err(|retry_after| {
        tracing::warn!(client = %client_id, path = %request.uri().path(), "Rate limit exceeded");
        RateLimitError {
            limit: state.rate_limiter.limit(),
            retry_after,
        }
    })?;

    let mut response = next.run(request).await;
    insert_limit_headers(response.headers_mut(), &info);

    Ok(response)
}
