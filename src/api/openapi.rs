//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS Dashboard Server",
        version = "0.3.0",
        description = "API server for the HRMS dashboard: account signup/login, profile management, and attachment storage"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Profile endpoints
        api::profile::get_profile,
        api::profile::save_profile,
        // File endpoints
        api::files::serve_file,
        // Auth endpoints
        services::auth::signup,
        services::auth::login,
        services::auth::refresh,
        services::auth::get_current_account,
        services::auth::logout,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Profile
            models::profile::Profile,
            models::profile::ProfileDraft,
            models::profile::AttachmentKind,
            models::profile::UploadFailure,
            models::profile::CommitOutcome,
            api::profile::SaveProfileResponse,
            // Auth
            models::account::SignupRequest,
            models::account::LoginRequest,
            models::account::AccountResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Profile", description = "Profile record and attachment management"),
        (name = "Files", description = "Attachment serving"),
        (name = "Auth", description = "Account signup, login, and sessions")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add session cookie security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Cookie(
                        utoipa::openapi::security::ApiKeyValue::new(crate::config::ACCESS_COOKIE),
                    ),
                ),
            );
        }
    }
}
