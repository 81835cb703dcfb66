//! Shared fixtures for the integration tests.
//!
//! The real router runs over in-memory repositories and a scripted voice
//! provider, so no database or network is needed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use voicedesk::api::{create_router, AppState};
use voicedesk::config::{Config, Environment};
use voicedesk::domain::{Call, CallQuery, NewUser, Password, User, UserRole};
use voicedesk::errors::{AppError, AppResult};
use voicedesk::infra::{
    CallRepository, ProviderError, Repositories, SignedUrlReply, UserReply, UserRepository,
    VoiceProvider,
};
use voicedesk::services::{ServiceContainer, Services};

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const PASSWORD: &str = "Secure@123";

// =============================================================================
// In-memory repositories
// =============================================================================

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUsers {
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict(
                "Duplicate field value. Please use another value.",
            ));
        }

        let mut created = User::new(Uuid::new_v4(), user.name, user.email, user.password_hash);
        created.role = user.role;
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
        changed_at: DateTime<Utc>,
    ) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("user not found"))?;
        user.password_hash = password_hash;
        user.password_changed_at = Some(changed_at);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct InMemoryCalls {
    calls: Mutex<Vec<Call>>,
}

impl InMemoryCalls {
    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn newest_first(mut calls: Vec<Call>) -> Vec<Call> {
        calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        calls
    }
}

#[async_trait]
impl CallRepository for InMemoryCalls {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Call>> {
        Ok(self.calls.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn list(&self, query: &CallQuery) -> AppResult<(Vec<Call>, u64)> {
        let mut matching: Vec<Call> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_active(&self) -> AppResult<Vec<Call>> {
        let active = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status.is_active())
            .cloned()
            .collect();
        Ok(Self::newest_first(active))
    }

    async fn find_by_customer(&self, customer_id: &str) -> AppResult<Vec<Call>> {
        let owned = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(owned))
    }

    async fn create(&self, call: Call) -> AppResult<Call> {
        self.calls.lock().unwrap().push(call.clone());
        Ok(call)
    }

    async fn save(&self, call: Call) -> AppResult<Call> {
        let mut calls = self.calls.lock().unwrap();
        match calls.iter_mut().find(|c| c.id == call.id) {
            Some(slot) => *slot = call.clone(),
            None => calls.push(call.clone()),
        }
        Ok(call)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut calls = self.calls.lock().unwrap();
        let before = calls.len();
        calls.retain(|c| c.id != id);
        Ok(calls.len() != before)
    }
}

// =============================================================================
// Scripted voice provider
// =============================================================================

pub struct FakeProvider;

#[async_trait]
impl VoiceProvider for FakeProvider {
    async fn signed_url(
        &self,
        _api_key: &str,
        agent_id: &str,
    ) -> Result<SignedUrlReply, ProviderError> {
        Ok(SignedUrlReply {
            signed_url: Some(format!("wss://voice.test/convai?agent_id={}", agent_id)),
            expires_at: None,
        })
    }

    async fn user(&self, _api_key: &str) -> Result<UserReply, ProviderError> {
        Ok(UserReply {
            subscription: Some(serde_json::json!({"tier": "starter"})),
        })
    }
}

// =============================================================================
// Application harness
// =============================================================================

/// Argon2 hash of [`PASSWORD`], computed once per test binary.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| Password::new(PASSWORD).unwrap().into_string())
        .clone()
}

pub fn test_config(environment: Environment) -> Config {
    Config::for_environment(environment, JWT_SECRET)
        .with_elevenlabs(Some("xi-test-key".to_string()), Some("agent-7".to_string()))
}

pub struct TestApp {
    pub router: Router,
    pub services: Services,
    pub users: Arc<InMemoryUsers>,
    pub calls: Arc<InMemoryCalls>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(Environment::Production))
    }

    pub fn with_config(config: Config) -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let calls = Arc::new(InMemoryCalls::default());
        let uow = Arc::new(Repositories::new(users.clone(), calls.clone()));
        let services = Services::new(uow, Arc::new(FakeProvider), config.clone());
        let router = create_router(AppState::from_services(&services, config));

        Self {
            router,
            services,
            users,
            calls,
        }
    }

    /// Seed a user holding [`PASSWORD`] and return it with a fresh token.
    pub fn seed_user(&self, email: &str, role: UserRole) -> (User, String) {
        let mut user = User::new(
            Uuid::new_v4(),
            "Seeded User".to_string(),
            email.to_string(),
            password_hash(),
        );
        user.role = role;
        self.users.insert(user.clone());

        let token = self.services.auth().issue_token(&user).unwrap();
        (user, token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }
}
