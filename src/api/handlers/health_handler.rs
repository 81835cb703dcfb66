//! Liveness endpoint.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;

pub const API_RUNNING: &str = "Voicedesk API is running";

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
}

/// Only the state is exposed; ping failures are logged.
#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealth {
    /// `healthy`, `unhealthy` or `detached`
    pub status: &'static str,
}

impl DatabaseHealth {
    fn from_ping(ping: Option<Result<(), DbErr>>) -> Self {
        let status = match ping {
            None => "detached",
            Some(Ok(())) => "healthy",
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Database ping failed");
                "unhealthy"
            }
        };
        Self { status }
    }
}

/// Always 200 while the process serves requests; the database state is
/// reported, not enforced.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ping = match &state.database {
        Some(db) => Some(db.ping().await),
        None => None,
    };
    let database = DatabaseHealth::from_ping(ping);

    Json(HealthResponse {
        status: "success",
        message: API_RUNNING,
        timestamp: Utc::now(),
        database,
    })
}
