//! Authentication service layer
//!
//! Provides business logic for credential checks, registration and user
//! lookup. Store and hasher failures are wrapped into [`AuthError::Internal`]
//! so callers never see raw storage errors.

use super::password::CredentialHasher;
use gatekeeper_core::{CoreError, NewUser, Role, User, UserPublic, UserRepository};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

/// Message shared by every credential failure, so unknown usernames and
/// wrong passwords are indistinguishable.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

/// User login request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User registration request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,

    #[serde(default)]
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    /// "admin" or "user"; anything else registers a regular user
    #[serde(default)]
    pub role: Option<String>,
}

/// Admin update of an existing user; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,

    /// "admin" or "user"; other values are rejected
    pub role: Option<String>,

    pub is_active: Option<bool>,
}

/// Authentication service errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username already exists")]
    UsernameTaken,

    #[error("{0}")]
    Validation(String),

    #[error("user not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Conflict(_) => AuthError::UsernameTaken,
            CoreError::NotFound(_) => AuthError::NotFound,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    /// Verified against when the username is unknown, so both failure paths
    /// cost one hash comparison
    dummy_hash: Option<String>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let dummy_hash = match hasher.hash("gatekeeper-dummy-password") {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(error = %e, "could not prepare dummy password hash");
                None
            }
        };

        Self {
            users,
            hasher,
            dummy_hash,
        }
    }

    /// Check a username/password pair
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - The full user record
    /// * `Err(AuthError::InvalidCredentials)` - Unknown user or wrong password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to fetch user: {e}")))?;

        let Some(user) = user else {
            if let Some(dummy) = &self.dummy_hash {
                // Result ignored, this only equalizes timing
                let _ = self.verify_password(password, dummy).await;
            }
            return Err(AuthError::InvalidCredentials);
        };

        match self.verify_password(password, &user.password_hash).await {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                // Same answer as a wrong password
                tracing::error!(user_id = user.id, error = %e, "stored password hash is unusable");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `Ok(UserPublic)` - Newly created user, without the password hash
    /// * `Err(AuthError)` - Validation failure or duplicate username
    pub async fn register(&self, request: RegisterRequest) -> Result<UserPublic, AuthError> {
        if request.username.is_empty() || request.password.is_empty() || request.email.is_empty()
        {
            return Err(AuthError::Validation(
                "username, password and email are required".to_string(),
            ));
        }

        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let role = Role::parse_or_default(request.role.as_deref());

        let existing = self
            .users
            .find_by_username(&request.username)
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to check existing user: {e}")))?;
        if existing.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hash_password(request.password).await?;

        // A concurrent registration may still win the race; the store's
        // Conflict maps to UsernameTaken
        let user = self
            .users
            .create(NewUser {
                username: request.username,
                password_hash,
                email: request.email,
                role,
            })
            .await?;

        tracing::debug!(user_id = user.id, role = %user.role, "user registered");

        Ok(user.to_public())
    }

    /// Fetch the public projection of an active user
    pub async fn lookup_by_id(&self, id: i64) -> Result<UserPublic, AuthError> {
        self.users
            .find_by_id(id)
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to fetch user: {e}")))?
            .map(|user| user.to_public())
            .ok_or(AuthError::NotFound)
    }

    /// All active users, ordered by id
    pub async fn list_users(&self) -> Result<Vec<UserPublic>, AuthError> {
        let users = self
            .users
            .list()
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to list users: {e}")))?;
        Ok(users.iter().map(User::to_public).collect())
    }

    /// Apply an admin update to an active user
    ///
    /// Unlike registration, an unknown role is a validation error rather than
    /// a silent downgrade.
    pub async fn update_user(
        &self,
        id: i64,
        request: UpdateUserRequest,
    ) -> Result<UserPublic, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let role = match request.role.as_deref() {
            Some(raw) => Some(Role::parse(raw).ok_or_else(|| {
                AuthError::Validation(format!("unknown role '{raw}', expected admin or user"))
            })?),
            None => None,
        };

        let mut user = self
            .users
            .find_by_id(id)
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to fetch user: {e}")))?
            .ok_or(AuthError::NotFound)?;

        if let Some(username) = request.username {
            user.username = username;
        }
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(role) = role {
            user.role = role;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }

        let updated = self.users.update(&user).await?;
        tracing::debug!(user_id = updated.id, role = %updated.role, "user updated");

        Ok(updated.to_public())
    }

    /// Deactivate an active user; the record is kept but no longer visible
    /// to lookups or login
    pub async fn deactivate_user(&self, id: i64) -> Result<(), AuthError> {
        self.update_user(
            id,
            UpdateUserRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{Argon2Hasher, PasswordConfig};
    use gatekeeper_core::InMemoryUserRepository;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2Hasher::new(PasswordConfig::insecure_fast())),
        )
    }

    fn register_request(username: &str, password: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let service = service();
        let public = service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();

        assert_eq!(public.username, "alice");
        assert_eq!(public.role, Role::User);

        let user = service.authenticate("alice", "secret1").await.unwrap();
        assert_eq!(user.id, public.id);
        assert_ne!(user.password_hash, "secret1");
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let service = service();
        service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();

        let wrong_password = service.authenticate("alice", "wrong-pass").await.unwrap_err();
        let unknown_user = service.authenticate("mallory", "secret1").await.unwrap_err();

        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert_eq!(wrong_password.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let service = service();
        service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();

        let result = service
            .register(register_request("alice", "other-pass", "b@x.com"))
            .await;
        assert_eq!(result, Err(AuthError::UsernameTaken));
        assert_eq!(
            AuthError::UsernameTaken.to_string(),
            "username already exists"
        );
    }

    #[tokio::test]
    async fn test_required_fields() {
        let service = service();

        for request in [
            register_request("", "secret1", "a@x.com"),
            register_request("alice", "", "a@x.com"),
            register_request("alice", "secret1", ""),
        ] {
            let result = service.register(request).await;
            assert!(matches!(result, Err(AuthError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_field_constraints() {
        let service = service();

        let short_name = service
            .register(register_request("al", "secret1", "a@x.com"))
            .await;
        assert!(matches!(short_name, Err(AuthError::Validation(_))));

        let long_name = service
            .register(register_request(&"a".repeat(51), "secret1", "a@x.com"))
            .await;
        assert!(matches!(long_name, Err(AuthError::Validation(_))));

        let short_password = service
            .register(register_request("alice", "12345", "a@x.com"))
            .await;
        assert!(matches!(short_password, Err(AuthError::Validation(_))));

        let bad_email = service
            .register(register_request("alice", "secret1", "not-an-email"))
            .await;
        assert!(matches!(bad_email, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_role_handling() {
        let service = service();

        let mut admin = register_request("root", "secret1", "r@x.com");
        admin.role = Some("admin".to_string());
        assert_eq!(service.register(admin).await.unwrap().role, Role::Admin);

        let mut bogus = register_request("bob", "secret1", "b@x.com");
        bogus.role = Some("superuser".to_string());
        assert_eq!(service.register(bogus).await.unwrap().role, Role::User);

        let mut empty = register_request("carol", "secret1", "c@x.com");
        empty.role = Some(String::new());
        assert_eq!(service.register(empty).await.unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let service = service();
        let public = service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();

        assert_eq!(service.lookup_by_id(public.id).await.unwrap(), public);
        assert_eq!(service.lookup_by_id(999).await, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn test_unusable_stored_hash_is_invalid_credentials() {
        let users = Arc::new(InMemoryUserRepository::new());
        users
            .create(NewUser {
                username: "legacy".to_string(),
                password_hash: "not-a-phc-string".to_string(),
                email: "l@x.com".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let service = AuthService::new(
            users,
            Arc::new(Argon2Hasher::new(PasswordConfig::insecure_fast())),
        );

        let result = service.authenticate("legacy", "secret1").await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_list_users_hides_deactivated() {
        let service = service();
        let alice = service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();
        let bob = service
            .register(register_request("bob", "secret1", "b@x.com"))
            .await
            .unwrap();

        let listed = service.list_users().await.unwrap();
        assert_eq!(listed, vec![alice.clone(), bob.clone()]);

        service.deactivate_user(bob.id).await.unwrap();
        assert_eq!(service.list_users().await.unwrap(), vec![alice]);
        assert_eq!(
            service.authenticate("bob", "secret1").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(service.deactivate_user(bob.id).await, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn test_update_user_fields() {
        let service = service();
        let alice = service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                alice.id,
                UpdateUserRequest {
                    email: Some("alice@example.com".to_string()),
                    role: Some("admin".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, alice.id);
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "alice@example.com");
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(service.lookup_by_id(alice.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_user_rejections() {
        let service = service();
        let alice = service
            .register(register_request("alice", "secret1", "a@x.com"))
            .await
            .unwrap();
        service
            .register(register_request("bob", "secret1", "b@x.com"))
            .await
            .unwrap();

        let bad_role = service
            .update_user(
                alice.id,
                UpdateUserRequest {
                    role: Some("superuser".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_role, Err(AuthError::Validation(_))));

        let bad_email = service
            .update_user(
                alice.id,
                UpdateUserRequest {
                    email: Some("nope".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_email, Err(AuthError::Validation(_))));

        let taken = service
            .update_user(
                alice.id,
                UpdateUserRequest {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(taken, Err(AuthError::UsernameTaken));

        let missing = service.update_user(999, UpdateUserRequest::default()).await;
        assert_eq!(missing, Err(AuthError::NotFound));
    }

    #[test]
    fn test_core_error_mapping() {
        assert_eq!(
            AuthError::from(CoreError::Conflict("x".into())),
            AuthError::UsernameTaken
        );
        assert!(matches!(
            AuthError::from(CoreError::Database("down".into())),
            AuthError::Internal(_)
        ));
    }
}
