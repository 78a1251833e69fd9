//! Handlers behind the token gate

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use gatekeeper_core::Role;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Identity echoed back from the verified token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallerInfo {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

/// Protected sample payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProtectedDataResponse {
    pub message: String,
    pub status: String,
    pub user: CallerInfo,
}

/// Sample protected resource
#[utoipa::path(
    get,
    path = "/api/protected/data",
    tag = "users",
    responses(
        (status = 200, description = "Protected data", body = ProtectedDataResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn protected_data_handler(Identity(claims): Identity) -> impl IntoResponse {
    Json(ProtectedDataResponse {
        message: "This is protected data".to_string(),
        status: "success".to_string(),
        user: CallerInfo {
            user_id: claims.user_id(),
            username: claims.username().to_string(),
            role: claims.role(),
        },
    })
}

/// Current user profile
///
/// Reads the store rather than the token, so a deactivated account yields 404
/// even while its token is still valid.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user profile", body = gatekeeper_core::UserPublic),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "User no longer active", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Identity(claims): Identity,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.lookup_by_id(claims.user_id()).await?;
    Ok(Json(user))
}
