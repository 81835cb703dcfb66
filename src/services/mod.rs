//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.

mod auth_service;
mod call_service;
pub mod container;
mod voice_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{
    normalize_email, AuthService, AuthSession, Authenticator, Claims, Signup,
    INCORRECT_CREDENTIALS, INCORRECT_CURRENT_PASSWORD, PASSWORD_CHANGED_SINCE_LOGIN,
    USER_NO_LONGER_EXISTS,
};
pub use call_service::{call_not_found, CallManager, CallPage, CallService};
pub use voice_service::{
    ConnectionStatus, SignedUrl, VoiceGateway, VoiceService, WebhookEvent, WebhookEventKind,
};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
