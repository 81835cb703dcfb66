//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth_handler, call_handler, health_handler, voice_handler};
use crate::domain::{
    CallMetadata, CallPatch, CallResponse, CallStatus, InitiatedBy, NewCall, TranscriptEntry,
    UserResponse, UserRole,
};
use crate::services::{ConnectionStatus, SignedUrl};

/// OpenAPI documentation for the Voicedesk API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Voicedesk API",
        version = "0.1.0",
        description = "Call records, authentication and Eleven Labs conversational AI integration",
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::signup,
        auth_handler::login,
        auth_handler::logout,
        auth_handler::update_password,
        // Call endpoints
        call_handler::list_calls,
        call_handler::create_call,
        call_handler::active_calls,
        call_handler::customer_calls,
        call_handler::get_call,
        call_handler::update_call,
        call_handler::delete_call,
        // Voice endpoints
        voice_handler::get_signed_url,
        voice_handler::webhook,
        voice_handler::test_connection,
        health_handler::health,
    ),
    components(
        schemas(
            UserRole,
            UserResponse,
            CallStatus,
            InitiatedBy,
            CallMetadata,
            TranscriptEntry,
            NewCall,
            CallPatch,
            CallResponse,
            SignedUrl,
            ConnectionStatus,
            auth_handler::SignupRequest,
            auth_handler::LoginRequest,
            auth_handler::UpdatePasswordRequest,
            auth_handler::UserData,
            call_handler::CallData,
            call_handler::CallsData,
            health_handler::HealthResponse,
            health_handler::DatabaseHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login and password management"),
        (name = "Calls", description = "Call record management"),
        (name = "Voice", description = "Eleven Labs signed URLs and webhooks"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_call_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/calls"));
        assert!(doc.paths.paths.contains_key("/api/calls/{id}"));
        assert!(doc.paths.paths.contains_key("/api/elevenlabs/webhook"));
    }
}
