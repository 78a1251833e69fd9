//! API route definitions

use crate::auth::{require_auth, require_roles};
use crate::handlers::{admin, auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use gatekeeper_core::Role;
use std::sync::Arc;

/// Create the `/api` routes
///
/// Layers added last run first, so on admin routes the token gate runs
/// before the role gate.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/login", post(auth::login_handler))
        .route("/register", post(auth::register_handler))
        .route("/refresh", any(auth::refresh_handler));

    // Token gate only
    let protected_routes = Router::new()
        .route("/protected/data", get(users::protected_data_handler))
        .route("/me", get(users::me_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Token gate, then role gate
    let admin_routes = Router::new()
        .route(
            "/admin/users",
            get(admin::list_users_handler).post(admin::create_user_handler),
        )
        .route(
            "/admin/users/:id",
            get(admin::get_user_handler)
                .put(admin::update_user_handler)
                .delete(admin::delete_user_handler),
        )
        .route_layer(middleware::from_fn(require_roles([Role::Admin])))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}
