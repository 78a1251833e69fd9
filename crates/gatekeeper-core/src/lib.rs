//! Gatekeeper Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout gatekeeper:
//! - User records and their public projection
//! - Roles recognized by the authorization layer
//! - Common error types
//! - The credential store trait and its implementations
//! - Configuration management

pub mod config;
pub mod store;
pub mod user;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, Environment, LoggingConfig, ServerConfig,
};
pub use store::{InMemoryUserRepository, PgUserRepository, UserRepository};
pub use user::{NewUser, Role, User, UserPublic};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for gatekeeper operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
