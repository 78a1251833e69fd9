//! Admin user management
//!
//! Mounted behind the token gate and the `admin` role gate. Successful
//! changes are recorded in the audit log with the acting admin's id.

use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::auth::{Identity, RegisterRequest, UpdateUserRequest};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use gatekeeper_core::UserPublic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// All active users
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserPublic>,
    pub total: usize,
    pub status: String,
}

/// A created or updated user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserChangeResponse {
    pub user: UserPublic,
    pub message: String,
    pub status: String,
}

/// Deactivation result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDeactivatedResponse {
    pub message: String,
    pub user_id: i64,
    pub status: String,
}

fn record(identity: &Identity, target_user_id: i64, action: &str, headers: &HeaderMap) {
    let origin = RequestOrigin::from_headers(headers);
    audit_log(&AuditEvent::UserManaged {
        actor_id: identity.0.user_id(),
        target_user_id,
        action: action.to_string(),
        ip_address: origin.ip_address,
        user_agent: origin.user_agent,
    });
}

/// List active users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "Active users", body = UserListResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.auth.list_users().await?;
    Ok(Json(UserListResponse {
        total: users.len(),
        users,
        status: "success".to_string(),
    }))
}

/// Create a user
///
/// Same validation as self-registration; an unrecognised role creates a
/// regular user.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserChangeResponse),
        (status = 400, description = "Invalid or duplicate user", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    headers: HeaderMap,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.register(request).await?;
    record(&identity, user.id, "create", &headers);

    Ok((
        StatusCode::CREATED,
        Json(UserChangeResponse {
            user,
            message: "User created".to_string(),
            status: "success".to_string(),
        }),
    ))
}

/// Look up any active user by id
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found", body = UserPublic),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.lookup_by_id(id).await?;
    Ok(Json(user))
}

/// Update username, email, role or active flag of a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserChangeResponse),
        (status = 400, description = "Invalid or duplicate user", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    identity: Identity,
    headers: HeaderMap,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.update_user(id, request).await?;
    record(&identity, user.id, "update", &headers);

    Ok(Json(UserChangeResponse {
        user,
        message: "User updated".to_string(),
        status: "success".to_string(),
    }))
}

/// Deactivate a user
///
/// The record stays in the store; the account can no longer log in and
/// disappears from lookups. Tokens already issued stay valid until expiry.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User deactivated", body = UserDeactivatedResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    identity: Identity,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.auth.deactivate_user(id).await?;
    record(&identity, id, "deactivate", &headers);

    Ok(Json(UserDeactivatedResponse {
        message: "User deactivated".to_string(),
        user_id: id,
        status: "success".to_string(),
    }))
}
