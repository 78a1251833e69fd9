//! Credential store
//!
//! The authentication layer only depends on [`UserRepository`]; concrete
//! stores live in the submodules:
//! - [`InMemoryUserRepository`] for tests and database-less runs
//! - [`PgUserRepository`] for PostgreSQL

mod memory;
mod postgres;

pub use memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

use crate::user::{NewUser, User};
use crate::Result;
use async_trait::async_trait;

/// Lookup and persistence of user records.
///
/// Lookups only see active users and report absence as `Ok(None)`, so callers
/// can tell "not found" apart from a store failure. Implementations must be
/// safe to share across concurrent requests.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find an active user by login name
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find an active user by id
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// All active users, ordered by id
    async fn list(&self) -> Result<Vec<User>>;

    /// Persist a new user. Fails with [`crate::CoreError::Conflict`] when the
    /// username is already taken.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Overwrite username, email, role and active flag of an existing user.
    /// Fails with [`crate::CoreError::NotFound`] for an unknown id, then with
    /// [`crate::CoreError::Conflict`] when the new username is taken.
    async fn update(&self, user: &User) -> Result<User>;
}
