//! Voicedesk - call records and Eleven Labs conversational AI backend
//!
//! REST API for authenticating agents, managing call records and brokering
//! signed conversation URLs and webhooks with Eleven Labs.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Users, calls, list queries and validation rules
//! - **services**: Auth, call and voice use cases
//! - **infra**: Database, repositories, Eleven Labs client, rate limiter
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Response envelopes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! voicedesk serve --port 3001
//!
//! # Run migrations
//! voicedesk migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::{create_router, AppState};
pub use config::Config;
pub use domain::{Call, CallStatus, Password, User, UserRole};
pub use errors::{AppError, AppResult};
