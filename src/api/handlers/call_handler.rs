//! Call record handlers. Every route requires a session.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::middleware::{restrict_to, CurrentUser};
use crate::api::AppState;
use crate::domain::{Call, CallPatch, CallQuery, CallResponse, NewCall, UserRole};
use crate::errors::{AppError, AppResult};
use crate::types::{ApiResponse, Created, Listing, PageMeta};

pub const CALL_DELETED: &str = "Call successfully deleted";

/// `data` of single-call replies
#[derive(Debug, Serialize, ToSchema)]
pub struct CallData {
    pub call: CallResponse,
}

/// `data` of list replies
#[derive(Debug, Serialize, ToSchema)]
pub struct CallsData {
    pub calls: Vec<CallResponse>,
}

/// List entries projected down to `?fields=`
#[derive(Debug, Serialize)]
pub struct ProjectedCalls {
    pub calls: Vec<Value>,
}

/// Create call routes (mounted behind the auth gate)
pub fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_calls).post(create_call))
        .route("/active", get(active_calls))
        .route("/customer/:customer_id", get(customer_calls))
        .route(
            "/:id",
            get(get_call).patch(update_call).delete(delete_call),
        )
}

fn listing(calls: Vec<Call>) -> Listing<CallsData> {
    let calls: Vec<CallResponse> = calls.into_iter().map(CallResponse::from).collect();
    Listing::new(calls.len(), CallsData { calls })
}

/// List calls with filtering, sorting, field projection and pagination
#[utoipa::path(
    get,
    path = "/api/calls",
    tag = "Calls",
    params(
        ("page" = Option<u64>, Query, description = "Page number (1-indexed)"),
        ("limit" = Option<u64>, Query, description = "Page size, default 100"),
        ("sort" = Option<String>, Query, description = "Comma separated keys, `-` for descending"),
        ("fields" = Option<String>, Query, description = "Comma separated fields to return"),
        ("status" = Option<String>, Query, description = "Exact status filter"),
        ("customerId" = Option<String>, Query, description = "Exact customer filter"),
    ),
    responses(
        (status = 200, description = "Page of calls", body = CallsData),
        (status = 400, description = "Malformed filter"),
        (status = 401, description = "Not logged in")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_calls(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<CallQuery>,
) -> AppResult<Listing<ProjectedCalls>> {
    let page = state.call_service.list(&query).await?;

    let calls = page
        .calls
        .into_iter()
        .map(|call| {
            serde_json::to_value(CallResponse::from(call))
                .map(|value| query.project(value))
                .map_err(|e| AppError::internal(format!("Failed to serialize call: {}", e)))
        })
        .collect::<AppResult<Vec<_>>>()?;

    tracing::info!(results = calls.len(), total = page.total, "Retrieved calls");

    let meta = PageMeta {
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    };
    Ok(Listing::paginated(calls.len(), meta, ProjectedCalls { calls }))
}

/// Get a single call
#[utoipa::path(
    get,
    path = "/api/calls/{id}",
    tag = "Calls",
    params(("id" = uuid::Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call found", body = CallData),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Call not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_call(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> AppResult<ApiResponse<CallData>> {
    let call = state.call_service.get(id).await?;
    Ok(ApiResponse::success(CallData { call: call.into() }))
}

/// Create a call owned by the caller
#[utoipa::path(
    post,
    path = "/api/calls",
    tag = "Calls",
    request_body = NewCall,
    responses(
        (status = 201, description = "Call created", body = CallData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not logged in")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_call(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<NewCall>,
) -> AppResult<Created<CallData>> {
    let call = state
        .call_service
        .create(payload, current_user.0.id)
        .await?;

    Ok(Created(ApiResponse::success(CallData { call: call.into() })))
}

/// Patch status, end time, metadata or transcript
#[utoipa::path(
    patch,
    path = "/api/calls/{id}",
    tag = "Calls",
    params(("id" = uuid::Uuid, Path, description = "Call ID")),
    request_body = CallPatch,
    responses(
        (status = 200, description = "Call updated", body = CallData),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Call not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_call(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    ValidatedJson(patch): ValidatedJson<CallPatch>,
) -> AppResult<ApiResponse<CallData>> {
    let call = state.call_service.update(id, patch).await?;
    Ok(ApiResponse::success(CallData { call: call.into() }))
}

/// Delete a call (admin only)
#[utoipa::path(
    delete,
    path = "/api/calls/{id}",
    tag = "Calls",
    params(("id" = uuid::Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Call not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_call(
    State(state): State<AppState>,
    current_user: CurrentUser,
    IdPath(id): IdPath,
) -> AppResult<ApiResponse<()>> {
    restrict_to(&current_user, &[UserRole::Admin])?;

    state.call_service.delete(id).await?;
    tracing::info!(call_id = %id, user_id = %current_user.0.id, "Call deleted");

    Ok(ApiResponse::message(CALL_DELETED))
}

/// Calls still in progress
#[utoipa::path(
    get,
    path = "/api/calls/active",
    tag = "Calls",
    responses((status = 200, description = "Initiated or answered calls", body = CallsData)),
    security(("bearer_auth" = []))
)]
pub async fn active_calls(State(state): State<AppState>) -> AppResult<Listing<CallsData>> {
    Ok(listing(state.call_service.active().await?))
}

/// Every call of one customer, newest first
#[utoipa::path(
    get,
    path = "/api/calls/customer/{customerId}",
    tag = "Calls",
    params(("customerId" = String, Path, description = "Customer identifier")),
    responses((status = 200, description = "Calls of the customer", body = CallsData)),
    security(("bearer_auth" = []))
)]
pub async fn customer_calls(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> AppResult<Listing<CallsData>> {
    Ok(listing(state.call_service.by_customer(&customer_id).await?))
}
