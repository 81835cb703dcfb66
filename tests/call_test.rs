//! Call record endpoints through the full router.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;
use voicedesk::domain::UserRole;

async fn create(app: &TestApp, token: &str, body: Value) -> Value {
    let res = app.post("/api/calls", Some(token), body).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body["data"]["call"].clone()
}

#[tokio::test]
async fn test_create_call_defaults_and_owner() {
    let app = TestApp::new();
    let (user, token) = app.seed_user("agent@example.com", UserRole::User);

    let call = create(&app, &token, json!({"customerId": "  cust-1 "})).await;

    assert_eq!(call["customerId"], "cust-1");
    assert_eq!(call["status"], "initiated");
    assert_eq!(call["callDetails"], json!({}));
    assert_eq!(call["transcript"], json!([]));
    assert_eq!(call["createdBy"], user.id.to_string());
    assert!(call["endTime"].is_null());
    assert!(call["duration"].is_null());
}

#[tokio::test]
async fn test_create_call_validation() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    let res = app
        .post("/api/calls", Some(&token), json!({"customerId": "   "}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "customerId is required");

    let res = app
        .post(
            "/api/calls",
            Some(&token),
            json!({"customerId": "c", "callDetails": [1, 2]}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.calls.len(), 0);
}

#[tokio::test]
async fn test_create_call_reports_every_violation() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    let res = app.post("/api/calls", Some(&token), json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "customerId is required");

    let res = app
        .post(
            "/api/calls",
            Some(&token),
            json!({"status": "ringing", "startTime": 42, "callDetails": "x"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let message = res.body["message"].as_str().unwrap();
    assert!(message.contains("callDetails must be an object"));
    assert!(message.contains("customerId is required"));
    assert!(message.contains("startTime must be a valid date"));
    assert!(message.contains("status must be one of: initiated, answered, completed, missed"));

    let res = app.post("/api/calls", Some(&token), json!([1, 2])).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.calls.len(), 0);
}

#[tokio::test]
async fn test_duration_follows_start_and_end() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    let call = create(
        &app,
        &token,
        json!({"customerId": "cust-1", "startTime": "2024-05-01T10:00:00Z"}),
    )
    .await;
    let id = call["id"].as_str().unwrap();

    let res = app
        .patch(
            &format!("/api/calls/{}", id),
            Some(&token),
            json!({"endTime": "2024-05-01T10:02:30Z"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    let call = &res.body["data"]["call"];
    assert_eq!(call["duration"], 150.0);
    assert_eq!(call["calculatedDuration"], 150.0);
}

#[tokio::test]
async fn test_end_before_start_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    let call = create(
        &app,
        &token,
        json!({"customerId": "cust-1", "startTime": "2024-05-01T10:00:00Z"}),
    )
    .await;

    let res = app
        .patch(
            &format!("/api/calls/{}", call["id"].as_str().unwrap()),
            Some(&token),
            json!({"endTime": "2024-05-01T09:00:00Z"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_completing_a_call_stamps_end_time() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);
    let call = create(&app, &token, json!({"customerId": "cust-1"})).await;

    let res = app
        .patch(
            &format!("/api/calls/{}", call["id"].as_str().unwrap()),
            Some(&token),
            json!({"status": "completed"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    let call = &res.body["data"]["call"];
    assert_eq!(call["status"], "completed");
    assert!(call["endTime"].is_string());
    assert!(call["duration"].as_f64().is_some_and(|d| d >= 0.0));
}

#[tokio::test]
async fn test_empty_patch_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);
    let call = create(&app, &token, json!({"customerId": "cust-1"})).await;

    let res = app
        .patch(
            &format!("/api/calls/{}", call["id"].as_str().unwrap()),
            Some(&token),
            json!({}),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_missing_and_malformed_ids() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    let missing = uuid::Uuid::new_v4();
    let res = app
        .get(&format!("/api/calls/{}", missing), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        res.body["message"],
        format!("No call found with ID: {}", missing)
    );

    let res = app.get("/api/calls/not-a-uuid", Some(&token)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_pagination_and_projection() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    for i in 0..5 {
        create(&app, &token, json!({"customerId": format!("cust-{}", i)})).await;
    }

    let res = app
        .get(
            "/api/calls?page=2&limit=2&fields=customerId,status",
            Some(&token),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["results"], 2);
    assert_eq!(res.body["total"], 5);
    assert_eq!(res.body["page"], 2);
    assert_eq!(res.body["limit"], 2);
    assert_eq!(res.body["totalPages"], 3);

    let calls = res.body["data"]["calls"].as_array().unwrap();
    let keys: Vec<&String> = calls[0].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    assert!(calls[0].get("id").is_some());
    assert!(calls[0].get("transcript").is_none());
}

#[tokio::test]
async fn test_list_paging_is_bounded() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);
    create(&app, &token, json!({"customerId": "cust-1"})).await;

    let res = app
        .get("/api/calls?limit=18446744073709551615", Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["limit"], 1000);
    assert_eq!(res.body["results"], 1);

    let res = app
        .get("/api/calls?page=1000000000000000000", Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "page is out of range");
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    create(&app, &token, json!({"customerId": "a", "status": "missed"})).await;
    create(&app, &token, json!({"customerId": "b"})).await;

    let res = app.get("/api/calls?status=missed", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["data"]["calls"][0]["customerId"], "a");

    let res = app.get("/api/calls?status=ringing", Some(&token)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Repeated parameters collapse to the last occurrence
    let res = app
        .get("/api/calls?status=missed&status=initiated", Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["data"]["calls"][0]["customerId"], "b");
}

#[tokio::test]
async fn test_active_and_customer_views() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("agent@example.com", UserRole::User);

    create(&app, &token, json!({"customerId": "cust-1", "status": "answered"})).await;
    create(&app, &token, json!({"customerId": "cust-1", "status": "completed"})).await;
    create(&app, &token, json!({"customerId": "cust-2"})).await;

    let res = app.get("/api/calls/active", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["results"], 2);
    assert!(res.body.get("total").is_none());

    let res = app.get("/api/calls/customer/cust-1", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["results"], 2);
}

#[tokio::test]
async fn test_delete_is_admin_only() {
    let app = TestApp::new();
    let (_, user_token) = app.seed_user("agent@example.com", UserRole::User);
    let (_, admin_token) = app.seed_user("admin@example.com", UserRole::Admin);

    let call = create(&app, &user_token, json!({"customerId": "cust-1"})).await;
    let uri = format!("/api/calls/{}", call["id"].as_str().unwrap());

    let res = app.delete(&uri, Some(&user_token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(
        res.body["message"],
        "You do not have permission to perform this action"
    );
    assert_eq!(app.calls.len(), 1);

    let res = app.delete(&uri, Some(&admin_token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({"status": "success", "message": "Call successfully deleted"})
    );

    let res = app.delete(&uri, Some(&admin_token)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
