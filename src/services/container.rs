//! Service Container - Centralized service access.

use std::sync::Arc;

use super::{AuthService, Authenticator, CallManager, CallService, VoiceGateway, VoiceService};
use crate::config::Config;
use crate::infra::{Persistence, UnitOfWork, VoiceProvider};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    /// Get authentication service
    fn auth(&self) -> Arc<dyn AuthService>;

    /// Get call service
    fn calls(&self) -> Arc<dyn CallService>;

    /// Get voice gateway
    fn voice(&self) -> Arc<dyn VoiceService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    call_service: Arc<dyn CallService>,
    voice_service: Arc<dyn VoiceService>,
}

impl Services {
    /// Wire every service over one unit of work and provider.
    pub fn new<U: UnitOfWork + 'static>(
        uow: Arc<U>,
        provider: Arc<dyn VoiceProvider>,
        config: Config,
    ) -> Self {
        Self {
            voice_service: Arc::new(VoiceGateway::new(provider, &config)),
            call_service: Arc::new(CallManager::new(uow.clone())),
            auth_service: Arc::new(Authenticator::new(uow, config)),
        }
    }

    /// Create service container from database connection and config
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        provider: Arc<dyn VoiceProvider>,
        config: Config,
    ) -> Self {
        Self::new(Arc::new(Persistence::new(db)), provider, config)
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn calls(&self) -> Arc<dyn CallService> {
        self.call_service.clone()
    }

    fn voice(&self) -> Arc<dyn VoiceService> {
        self.voice_service.clone()
    }
}
