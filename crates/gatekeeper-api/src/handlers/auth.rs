//! Authentication API handlers
//!
//! Login, registration and the token refresh placeholder. Each outcome is
//! recorded in the audit log.

use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::auth::{AuthError, LoginRequest, RegisterRequest};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use gatekeeper_core::UserPublic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed bearer token
    pub token: String,
    pub user: UserPublic,
}

/// Login with username and password
///
/// # Responses
///
/// * `200 OK` - Token and public user record
/// * `400 Bad Request` - Malformed body
/// * `401 Unauthorized` - Invalid credentials
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let origin = RequestOrigin::from_headers(&headers);

    let user = match state
        .auth
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                username: request.username,
                reason: failure_reason(&e),
                ip_address: origin.ip_address,
                user_agent: origin.user_agent,
            });
            return Err(e.into());
        }
    };

    let token = state
        .tokens
        .issue(user.id, &user.username, user.role, state.environment())
        .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;

    audit_log(&AuditEvent::LoginSuccess {
        user_id: user.id,
        username: user.username.clone(),
        ip_address: origin.ip_address,
        user_agent: origin.user_agent,
    });

    Ok(Json(LoginResponse {
        token,
        user: user.to_public(),
    }))
}

/// Register a new user account
///
/// The role defaults to `user` when absent or unrecognised.
///
/// # Responses
///
/// * `200 OK` - Public projection of the new user
/// * `400 Bad Request` - Malformed body, failed validation or duplicate username
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = UserPublic),
        (status = 400, description = "Invalid or duplicate user", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let origin = RequestOrigin::from_headers(&headers);
    let username = request.username.clone();

    match state.auth.register(request).await {
        Ok(user) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: user.id,
                username: user.username.clone(),
                role: user.role.to_string(),
                ip_address: origin.ip_address,
                user_agent: origin.user_agent,
            });
            Ok(Json(user))
        }
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                username,
                reason: failure_reason(&e),
                ip_address: origin.ip_address,
                user_agent: origin.user_agent,
            });
            Err(e.into())
        }
    }
}

/// Refresh an access token
///
/// Not implemented; every method answers 501.
#[utoipa::path(
    post,
    path = "/api/refresh",
    tag = "auth",
    responses(
        (status = 501, description = "Not implemented", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler() -> AppError {
    AppError::NotImplemented("token refresh is not implemented".to_string())
}

// Internal details stay out of the audit trail too
fn failure_reason(err: &AuthError) -> String {
    match err {
        AuthError::Internal(_) => "internal error".to_string(),
        other => other.to_string(),
    }
}
