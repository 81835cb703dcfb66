//! HTTP request handlers.

pub mod auth_handler;
pub mod call_handler;
pub mod health_handler;
pub mod voice_handler;

pub use auth_handler::auth_routes;
pub use call_handler::call_routes;
pub use health_handler::health;
pub use voice_handler::voice_routes;
