//! Voice provider endpoints, health, fallback and rate limiting.

mod common;

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tokio_test::assert_ok;

use common::{test_config, TestApp};
use voicedesk::config::Environment;
use voicedesk::domain::UserRole;

#[tokio::test]
async fn test_signed_url_is_public() {
    let app = TestApp::new();

    let res = app.get("/api/get-signed-url", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "success");
    assert_eq!(res.body["data"]["agentId"], "agent-7");
    assert!(res.body["data"]["expiresAt"].is_null());
    assert!(res.body["data"]["signedUrl"]
        .as_str()
        .is_some_and(|url| url.contains("agent-7")));
}

#[tokio::test]
async fn test_signed_url_without_credentials() {
    let config = test_config(Environment::Production).with_elevenlabs(None, None);
    let app = TestApp::with_config(config);

    let res = app.get("/api/get-signed-url", None).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["status"], "error");
    assert_eq!(res.body["message"], "Eleven Labs API key is not configured");
}

#[tokio::test]
async fn test_webhook_acknowledges_valid_events() {
    let app = TestApp::new();

    let res = app
        .post(
            "/api/elevenlabs/webhook",
            None,
            json!({
                "event_type": "conversation.started",
                "conversation_id": "conv-1",
                "agent_id": "agent-7"
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({"status": "success", "message": "Webhook received"})
    );
}

#[tokio::test]
async fn test_malformed_webhook_still_returns_200() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/elevenlabs/webhook")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.send(request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({"status": "error", "message": "Webhook processed with errors"})
    );

    let res = app
        .post("/api/elevenlabs/webhook", None, json!({"event_type": "x"}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "error");
}

#[tokio::test]
async fn test_webhook_accepts_large_events_and_soft_fails_oversized_ones() {
    let app = TestApp::new();

    let res = app
        .post(
            "/api/elevenlabs/webhook",
            None,
            json!({
                "event_type": "conversation.ended",
                "conversation_id": "conv-1",
                "transcript": "x".repeat(20_000)
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "success");

    let res = app
        .post(
            "/api/elevenlabs/webhook",
            None,
            json!({
                "event_type": "conversation.ended",
                "transcript": "x".repeat(2 * 1024 * 1024)
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({"status": "error", "message": "Webhook processed with errors"})
    );
}

#[tokio::test]
async fn test_connection_check_is_admin_only() {
    let app = TestApp::new();
    let (_, user_token) = app.seed_user("agent@example.com", UserRole::User);
    let (_, admin_token) = app.seed_user("admin@example.com", UserRole::Admin);

    let res = app.get("/api/elevenlabs/test-connection", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .get("/api/elevenlabs/test-connection", Some(&user_token))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .get("/api/elevenlabs/test-connection", Some(&admin_token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Eleven Labs API connection successful");
    assert_eq!(res.body["data"]["isConnected"], true);
    assert_eq!(res.body["data"]["subscription"]["tier"], "starter");
}

#[tokio::test]
async fn test_health_and_fallback() {
    let app = TestApp::new();

    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "success");
    assert_eq!(res.body["database"]["status"], "detached");
    assert!(res.headers.contains_key("x-content-type-options"));

    let res = app.get("/api/nowhere", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        res.body,
        json!({"status": "error", "message": "Cannot find /api/nowhere on this server"})
    );
}

#[tokio::test]
async fn test_rate_limit_spares_webhooks() {
    let mut config = test_config(Environment::Production);
    config.rate_limit_max_requests = 2;
    let app = TestApp::with_config(config);

    for _ in 0..2 {
        let res = app.get("/health", None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.headers.contains_key("ratelimit-remaining"));
    }

    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.body,
        json!({"status": "error", "message": "Too many requests, please try again later."})
    );
    assert_ok!(res.headers[header::RETRY_AFTER].to_str());

    let webhook = json!({"event_type": "conversation.ended", "conversation_id": "conv-1"});
    for _ in 0..3 {
        let res = app.post("/api/elevenlabs/webhook", None, webhook.clone()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["status"], "success");
    }
}

fn health_from(peer: &str, forwarded_for: &str) -> Request<Body> {
    let mut request = Request::builder()
        .uri("/health")
        .header("X-Forwarded-For", forwarded_for)
        .body(Body::empty())
        .unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_evade_limit() {
    let mut config = test_config(Environment::Production);
    config.rate_limit_max_requests = 2;
    let app = TestApp::with_config(config);

    let mut statuses = Vec::new();
    for i in 0..4 {
        let res = app
            .send(health_from("198.51.100.9:5000", &format!("203.0.113.{}", i)))
            .await;
        statuses.push(res.status);
    }

    assert_eq!(
        statuses,
        [
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );

    // Another peer has its own budget
    let res = app.send(health_from("198.51.100.10:5000", "203.0.113.0")).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_development_errors_expose_detail() {
    let app = TestApp::with_config(test_config(Environment::Development));

    let res = app.get("/api/calls", Some("not-a-jwt")).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["status"], "fail");
    assert_eq!(res.body["message"], "Invalid token. Please log in again.");
    assert!(res.body["error"].is_string());
}
