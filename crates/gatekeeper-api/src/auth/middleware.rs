//! Token Gate and Role Gate middleware
//!
//! The token gate validates the bearer token and stores the verified
//! [`Claims`] in request extensions. The role gate reads them back, so it
//! must always be layered after the token gate.
use super::jwt::Claims;
use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use gatekeeper_core::Role;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const NO_TOKEN: &str = "no token";
pub const INVALID_TOKEN: &str = "invalid token";

/// Pull the token out of the Authorization header
///
/// Extraction is tolerant: a value without the `"Bearer "` prefix is used as
/// is. Returns an empty string when the header is absent or not visible ASCII.
pub fn extract_bearer_token(headers: &HeaderMap) -> &str {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    value.strip_prefix("Bearer ").unwrap_or(value)
}

/// Token Gate
///
/// Rejects with 401 before the handler runs when the token is absent or fails
/// validation. The failure class only goes to the audit log.
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use gatekeeper_api::auth::require_auth;
///
/// let app = Router::new()
///     .route("/api/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
///     .with_state(state);
/// ```
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers());

    if token.is_empty() {
        let origin = RequestOrigin::from_headers(request.headers());
        audit_log(&AuditEvent::InvalidToken {
            reason: "missing".to_string(),
            path: request.uri().path().to_string(),
            ip_address: origin.ip_address,
            user_agent: origin.user_agent,
        });
        return Err(AppError::Unauthorized(NO_TOKEN.to_string()));
    }

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(e) => {
            let origin = RequestOrigin::from_headers(request.headers());
            audit_log(&AuditEvent::InvalidToken {
                reason: e.kind().to_string(),
                path: request.uri().path().to_string(),
                ip_address: origin.ip_address,
                user_agent: origin.user_agent,
            });
            return Err(AppError::Unauthorized(INVALID_TOKEN.to_string()));
        }
    };

    tracing::debug!(user_id = claims.user_id(), role = %claims.role(), "token accepted");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// Role Gate factory
///
/// The returned middleware lets the request through when the caller's role
/// is a member of `roles`. No role is implicitly privileged.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use gatekeeper_api::auth::{require_auth, require_roles};
/// use gatekeeper_core::Role;
///
/// let app = Router::new()
///     .route("/api/admin/users/:id", get(get_user))
///     .route_layer(middleware::from_fn(require_roles([Role::Admin])))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));
/// ```
pub fn require_roles<I>(
    roles: I,
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone + Send + Sync + 'static
where
    I: IntoIterator<Item = Role>,
{
    let allowed: Arc<HashSet<Role>> = Arc::new(roles.into_iter().collect());

    move |request: Request<Body>, next: Next| {
        let allowed = Arc::clone(&allowed);
        Box::pin(async move {
            // Token gate missing from the chain
            let Some(claims) = request.extensions().get::<Claims>() else {
                tracing::warn!(
                    path = %request.uri().path(),
                    "role gate reached without verified claims"
                );
                return Err(AppError::Unauthorized(NO_TOKEN.to_string()));
            };

            if !allowed.contains(&claims.role()) {
                let origin = RequestOrigin::from_headers(request.headers());
                audit_log(&AuditEvent::AccessDenied {
                    user_id: Some(claims.user_id()),
                    username: Some(claims.username().to_string()),
                    role: Some(claims.role().to_string()),
                    required_roles: describe_roles(&allowed),
                    path: request.uri().path().to_string(),
                    ip_address: origin.ip_address,
                    user_agent: origin.user_agent,
                });
                return Err(AppError::Forbidden("insufficient permissions".to_string()));
            }

            Ok(next.run(request).await)
        })
    }
}

fn describe_roles(roles: &HashSet<Role>) -> String {
    let mut names: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
    names.sort_unstable();
    names.join(",")
}

/// Verified caller identity
///
/// Extracted from the claims the token gate attached; rejects with 401 when
/// the handler is mounted without the gate.
///
/// ```ignore
/// async fn me(Identity(claims): Identity) -> String {
///     format!("Hello, {}!", claims.username())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Identity)
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))
    }
}
