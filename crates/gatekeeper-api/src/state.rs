//! Application state management

use crate::auth::{AuthService, CredentialHasher, TokenCodec};
use gatekeeper_core::{AppConfig, Environment, UserRepository};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Built once at startup. Handlers and middleware read configuration from
/// here, never from the process environment.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token issuance and validation
    pub tokens: TokenCodec,
    /// Credential checks, registration and lookup
    pub auth: AuthService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create application state from a validated configuration
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let tokens = TokenCodec::new(&config.auth);
        let auth = AuthService::new(users, hasher);

        Self {
            config,
            tokens,
            auth,
            start_time: Instant::now(),
        }
    }

    /// Deployment mode, which selects the token lifetime
    pub fn environment(&self) -> Environment {
        self.config.auth.environment
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// State backed by the in-memory store and cheap Argon2 parameters
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        use crate::auth::{Argon2Hasher, PasswordConfig};
        use gatekeeper_core::InMemoryUserRepository;

        let mut config = AppConfig::default();
        config.auth.jwt_secret = "test-secret-for-integration-tests".to_string();

        Self::new(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2Hasher::new(PasswordConfig::insecure_fast())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_defaults_to_development() {
        let state = AppState::for_testing();
        assert_eq!(state.environment(), Environment::Development);
        assert_eq!(state.tokens.issuer(), "gatekeeper-api");
        assert!(state.uptime_secs() < 60);
    }
}
