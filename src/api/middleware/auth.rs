//! JWT authentication middleware.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::api::AppState;
use crate::config::{BEARER_TOKEN_PREFIX, JWT_COOKIE_NAME, LOGGED_OUT_COOKIE_VALUE};
use crate::domain::{User, UserRole};
use crate::errors::{AppError, AppResult};

pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in to get access.";
pub const NO_PERMISSION: &str = "You do not have permission to perform this action";

/// Authenticated user resolved by [`protect`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Check if user has admin role.
    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized(NOT_LOGGED_IN))
    }
}

/// Session token from `Authorization: Bearer` or, failing that, the `jwt`
/// cookie. The logout marker never counts as a token.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(JWT_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty() && v != LOGGED_OUT_COOKIE_VALUE)
}

/// JWT authentication middleware.
///
/// Resolves the session token to a live user and injects [`CurrentUser`]
/// into the request extensions.
pub async fn protect(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        session_token(request.headers()).ok_or_else(|| AppError::unauthorized(NOT_LOGGED_IN))?;

    let user = state.auth_service.authenticate(&token).await?;
    tracing::debug!(user_id = %user.id, role = %user.role, "Request authenticated");

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Require one of `roles`, returns Forbidden error otherwise.
pub fn restrict_to(user: &CurrentUser, roles: &[UserRole]) -> AppResult<()> {
    if roles.contains(&user.0.role) {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.0.id, role = %user.0.role, "Access denied");
        Err(AppError::forbidden(NO_PERMISSION))
    }
}
