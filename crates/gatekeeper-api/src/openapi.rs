//! OpenAPI document
//!
//! Served as JSON at `/api-docs/openapi.json` with Swagger UI at `/swagger-ui`.

use crate::auth::{LoginRequest, RegisterRequest, UpdateUserRequest};
use crate::error::ApiError;
use crate::handlers::{admin, auth, health, users};
use gatekeeper_core::{Role, UserPublic};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Adds the bearer token security scheme referenced by protected paths
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
                        .description(Some("Token returned by POST /api/login"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatekeeper API",
        description = "Bearer token authentication with role-based route guards"
    ),
    paths(
        health::health_check,
        auth::login_handler,
        auth::register_handler,
        auth::refresh_handler,
        users::protected_data_handler,
        users::me_handler,
        admin::list_users_handler,
        admin::create_user_handler,
        admin::get_user_handler,
        admin::update_user_handler,
        admin::delete_user_handler,
    ),
    components(schemas(
        ApiError,
        LoginRequest,
        RegisterRequest,
        UpdateUserRequest,
        auth::LoginResponse,
        health::HealthResponse,
        users::CallerInfo,
        users::ProtectedDataResponse,
        admin::UserListResponse,
        admin::UserChangeResponse,
        admin::UserDeactivatedResponse,
        UserPublic,
        Role,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Login and registration"),
        (name = "users", description = "Authenticated endpoints"),
        (name = "admin", description = "Admin-only endpoints"),
    )
)]
pub struct ApiDoc;
