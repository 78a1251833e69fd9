//! Security audit logging for authentication events
//!
//! All audit events are logged at INFO level with the "audit" target,
//! making them easy to filter and route to security monitoring systems.
//! Passwords and tokens are never part of an event.
//!
//! # Example
//!
//! ```ignore
//! use gatekeeper_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     username: user.username.clone(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful login
    LoginSuccess {
        user_id: i64,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful registration
    RegistrationSuccess {
        user_id: i64,
        username: String,
        role: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Missing, malformed, forged or expired token
    InvalidToken {
        reason: String,
        path: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Valid identity without the required role
    AccessDenied {
        user_id: Option<i64>,
        username: Option<String>,
        role: Option<String>,
        required_roles: String,
        path: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Admin created, updated or deactivated an account
    UserManaged {
        actor_id: i64,
        target_user_id: i64,
        action: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },
}

/// Client details attached to audit events
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event with structured fields
///
/// The full event is also serialized to JSON in the `event` field for log
/// aggregators.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            username,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            username,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::RegistrationSuccess {
            user_id,
            username,
            role,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                role = %role,
                ip_address = ?ip_address,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure {
            username,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?ip_address,
                "Registration failed"
            );
        }
        AuditEvent::InvalidToken {
            reason,
            path,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                path = %path,
                ip_address = ?ip_address,
                "Invalid token"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            role,
            required_roles,
            path,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = ?user_id,
                role = ?role,
                required_roles = %required_roles,
                path = %path,
                ip_address = ?ip_address,
                "Access denied"
            );
        }
        AuditEvent::UserManaged {
            actor_id,
            target_user_id,
            action,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                actor_id = %actor_id,
                target_user_id = %target_user_id,
                action = %action,
                ip_address = ?ip_address,
                "User account changed"
            );
        }
    }
}

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, then X-Real-IP. Connection info would need to be
/// passed separately.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // Take the first IP in the chain (client IP)
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: 1,
            username: "alice".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("login_success"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            username: "alice".to_string(),
            reason: "invalid username or password".to_string(),
            ip_address: None,
            user_agent: Some("Test Agent".to_string()),
        });
        audit_log(&AuditEvent::AccessDenied {
            user_id: Some(2),
            username: Some("bob".to_string()),
            role: Some("user".to_string()),
            required_roles: "admin".to_string(),
            path: "/api/admin/users/1".to_string(),
            ip_address: None,
            user_agent: None,
        });
        audit_log(&AuditEvent::UserManaged {
            actor_id: 1,
            target_user_id: 2,
            action: "deactivate".to_string(),
            ip_address: Some("203.0.113.1".to_string()),
            user_agent: None,
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(
            extract_ip_address(&headers),
            Some("203.0.113.1".to_string())
        );
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(
            extract_ip_address(&headers),
            Some("203.0.113.1".to_string())
        );
    }

    #[test]
    fn test_request_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            "Mozilla/5.0 (Test)".parse().unwrap(),
        );

        let origin = RequestOrigin::from_headers(&headers);
        assert_eq!(origin.ip_address, None);
        assert_eq!(origin.user_agent.as_deref(), Some("Mozilla/5.0 (Test)"));
    }
}
