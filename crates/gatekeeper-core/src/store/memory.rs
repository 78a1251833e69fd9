use super::UserRepository;
use crate::user::{NewUser, User};
use crate::{CoreError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process user store
///
/// Ids are assigned sequentially starting at 1. Username uniqueness covers
/// inactive users too, mirroring the unique index of the SQL schema.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    users: HashMap<i64, User>,
    next_id: i64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                users: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Number of stored users, active or not
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.is_active && u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).filter(|u| u.is_active).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.is_active)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.username == user.username) {
            return Err(CoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let now = Utc::now();
        let id = inner.next_id;
        inner.next_id += 1;

        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            role: user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(id, created.clone());

        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(&user.id) {
            return Err(CoreError::NotFound(format!("user {}", user.id)));
        }

        if inner
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(CoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let stored = inner
            .users
            .get_mut(&user.id)
            .ok_or_else(|| CoreError::NotFound(format!("user {}", user.id)))?;

        stored.username = user.username.clone();
        stored.email = user.email.clone();
        stored.role = user.role;
        stored.is_active = user.is_active;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }
}
