//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, RateLimiter, VoiceProvider};
use crate::services::{AuthService, CallService, ServiceContainer, Services, VoiceService};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// Call service
    pub call_service: Arc<dyn CallService>,
    /// Voice provider gateway
    pub voice_service: Arc<dyn VoiceService>,
    /// Per-client request counters
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
    /// Database handle, absent when the router runs over in-memory stores
    pub database: Option<Arc<Database>>,
}

impl AppState {
    /// Create application state from a database connection and config.
    pub fn from_config(
        database: Arc<Database>,
        provider: Arc<dyn VoiceProvider>,
        config: Config,
    ) -> Self {
        let container =
            Services::from_connection(database.get_connection(), provider, config.clone());
        Self::from_services(&container, config).with_database(database)
    }

    /// Create application state from any service container.
    pub fn from_services(container: &dyn ServiceContainer, config: Config) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        ));

        Self {
            auth_service: container.auth(),
            call_service: container.calls(),
            voice_service: container.voice(),
            rate_limiter,
            config: Arc::new(config),
            database: None,
        }
    }

    pub fn with_database(mut self, database: Arc<Database>) -> Self {
        self.database = Some(database);
        self
    }
}
