//! API middleware.

mod auth;
mod error_handler;
mod rate_limit;
mod security;

pub use auth::{protect, restrict_to, session_token, CurrentUser, NOT_LOGGED_IN, NO_PERMISSION};
pub use error_handler::error_handler;
pub use rate_limit::{client_identifier, rate_limit_middleware, RateLimitError, RATE_LIMITED};
pub use security::security_headers;
