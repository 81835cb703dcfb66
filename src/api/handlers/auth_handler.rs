//! Authentication handlers.

use axum::{
    extract::State,
    http::HeaderMap,
    middleware,
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{protect, CurrentUser};
use crate::api::AppState;
use crate::config::{JWT_COOKIE_NAME, LOGGED_OUT_COOKIE_SECONDS, LOGGED_OUT_COOKIE_VALUE};
use crate::domain::validation::{
    error, not_blank, password_strength, required, well_formed, PASSWORDS_DO_NOT_MATCH,
};
use crate::domain::{Input, UserResponse, UserRole};
use crate::errors::AppResult;
use crate::services::{AuthSession, Signup};
use crate::types::{ApiResponse, Created};

/// User registration request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "signup_passwords_match", skip_on_field_errors = false))]
pub struct SignupRequest {
    /// User display name
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        custom(function = "not_blank", message = "name is required")
    )]
    #[schema(value_type = String, example = "Jane Doe")]
    pub name: Input<String>,
    /// User email address
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        email(message = "email must be a valid email")
    )]
    #[schema(value_type = String, example = "jane@example.com")]
    pub email: Input<String>,
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        custom(function = "password_strength")
    )]
    #[schema(value_type = String, example = "Secure@123", min_length = 8)]
    pub password: Input<String>,
    #[validate(custom(function = "required"), custom(function = "well_formed"))]
    #[schema(value_type = String, example = "Secure@123")]
    pub password_confirm: Input<String>,
    /// Accepted for compatibility; signup always creates a `user`.
    #[validate(custom(function = "well_formed", message = "role must be one of: user, admin"))]
    #[schema(value_type = Option<UserRole>)]
    pub role: Input<UserRole>,
}

/// User login request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        email(message = "email must be a valid email")
    )]
    #[schema(value_type = String, example = "jane@example.com")]
    pub email: Input<String>,
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        custom(function = "not_blank")
    )]
    #[schema(value_type = String, example = "Secure@123")]
    pub password: Input<String>,
}

/// Password change request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "update_passwords_match", skip_on_field_errors = false))]
pub struct UpdatePasswordRequest {
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        custom(function = "not_blank")
    )]
    #[schema(value_type = String)]
    pub password_current: Input<String>,
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        custom(function = "password_strength")
    )]
    #[schema(value_type = String)]
    pub password: Input<String>,
    #[validate(custom(function = "required"), custom(function = "well_formed"))]
    #[schema(value_type = String)]
    pub password_confirm: Input<String>,
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Input<String>, D::Error> {
    Input::<String>::deserialize(deserializer).map(|input| input.map(|s| s.trim().to_string()))
}

/// Only compared once both values arrived as strings.
fn passwords_match(password: &Input<String>, confirm: &Input<String>) -> Result<(), ValidationError> {
    match (password.as_present(), confirm.as_present()) {
        (Some(password), Some(confirm)) if password != confirm => {
            Err(error("passwords_match", PASSWORDS_DO_NOT_MATCH))
        }
        _ => Ok(()),
    }
}

fn signup_passwords_match(req: &SignupRequest) -> Result<(), ValidationError> {
    passwords_match(&req.password, &req.password_confirm)
}

fn update_passwords_match(req: &UpdatePasswordRequest) -> Result<(), ValidationError> {
    passwords_match(&req.password, &req.password_confirm)
}

/// `data` of every auth reply
#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: UserResponse,
}

/// Create authentication routes
pub fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/update-password",
            patch(update_password).route_layer(middleware::from_fn_with_state(state, protect)),
        )
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
}

/// Whether the request reached us over TLS, directly or through a proxy.
fn is_secure(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

fn session_cookie(state: &AppState, headers: &HeaderMap, token: String) -> Cookie<'static> {
    Cookie::build((JWT_COOKIE_NAME, token))
        .path("/")
        .max_age(time::Duration::days(state.config.jwt_cookie_expires_in_days))
        .http_only(true)
        .secure(is_secure(headers))
        .build()
}

fn send_token(
    state: &AppState,
    headers: &HeaderMap,
    jar: CookieJar,
    session: AuthSession,
) -> (CookieJar, ApiResponse<UserData>) {
    let jar = jar.add(session_cookie(state, headers, session.token.clone()));
    let body = ApiResponse::with_token(
        session.token,
        UserData {
            user: UserResponse::from(session.user),
        },
    );
    (jar, body)
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered, token issued", body = UserData),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> AppResult<(CookieJar, Created<UserData>)> {
    let email = payload.email.or_default();
    if payload.role.as_present().is_some_and(|r| r.is_admin()) {
        tracing::warn!(email = %email, "Signup requested admin role, downgraded to user");
    }

    let session = state
        .auth_service
        .signup(Signup {
            name: payload.name.or_default(),
            email,
            password: payload.password.or_default(),
        })
        .await?;

    let (jar, body) = send_token(&state, &headers, jar, session);
    Ok((jar, Created(body)))
}

/// Login and get JWT token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Incorrect email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<(CookieJar, ApiResponse<UserData>)> {
    let session = state
        .auth_service
        .login(&payload.email.or_default(), &payload.password.or_default())
        .await?;

    Ok(send_token(&state, &headers, jar, session))
}

/// Replace the session cookie with a short-lived marker
#[utoipa::path(
    get,
    path = "/api/auth/logout",
    tag = "Authentication",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    let marker = Cookie::build((JWT_COOKIE_NAME, LOGGED_OUT_COOKIE_VALUE))
        .path("/")
        .max_age(time::Duration::seconds(LOGGED_OUT_COOKIE_SECONDS))
        .http_only(true)
        .build();

    (jar.add(marker), ApiResponse::ok())
}

/// Change the caller's password and issue a fresh token
#[utoipa::path(
    patch,
    path = "/api/auth/update-password",
    tag = "Authentication",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed, new token issued", body = UserData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not logged in or current password incorrect")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<UpdatePasswordRequest>,
) -> AppResult<(CookieJar, ApiResponse<UserData>)> {
    let session = state
        .auth_service
        .update_password(
            current_user.0.id,
            &payload.password_current.or_default(),
            &payload.password.or_default(),
        )
        .await?;

    Ok(send_token(&state, &headers, jar, session))
}
