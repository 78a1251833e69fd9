//! PostgreSQL credential store
//!
//! Uses SQLx with a connection pool. The pool is safe to share between
//! request tasks, so a single repository instance serves the whole process.

use super::UserRepository;
use crate::user::{NewUser, Role, User};
use crate::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

const USER_COLUMNS: &str =
    "id, username, password_hash, email, role, is_active, created_at, updated_at";

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL user store
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Apply the embedded migrations from `gatekeeper-core/migrations/`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Database(format!("Failed to run migrations: {e}")))?;

        tracing::debug!("database migrations applied");
        Ok(())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    email: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            // Rows written by other tools may carry roles we do not know
            role: Role::parse_or_default(Some(&row.role)),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_write_error(e: sqlx::Error, username: &str) -> CoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            CoreError::Conflict(format!("username '{username}' already exists"))
        }
        _ => CoreError::Database(e.to_string()),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active = TRUE"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = TRUE ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::Database(format!("Failed to list users: {e}")))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password_hash, email, role, is_active) \
             VALUES ($1, $2, $3, $4, TRUE) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &user.username))?;

        Ok(row.into())
    }

    async fn update(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET username = $1, email = $2, role = $3, is_active = $4, \
             updated_at = NOW() WHERE id = $5 RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &user.username))?
        .ok_or_else(|| CoreError::NotFound(format!("user {}", user.id)))?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion() {
        let now = Utc::now();
        let row = UserRow {
            id: 3,
            username: "carol".to_string(),
            password_hash: "hash".to_string(),
            email: "carol@example.com".to_string(),
            role: "admin".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let user = User::from(row);
        assert_eq!(user.id, 3);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.password_hash, "hash");
    }

    #[test]
    fn test_unknown_role_in_row_degrades_to_user() {
        let now = Utc::now();
        let row = UserRow {
            id: 4,
            username: "dave".to_string(),
            password_hash: "hash".to_string(),
            email: "dave@example.com".to_string(),
            role: "superuser".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(User::from(row).role, Role::User);
    }

    #[test]
    fn test_migrations_are_embedded() {
        let migrator = sqlx::migrate!("./migrations");
        let migrations: Vec<_> = migrator.iter().collect();

        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version, 1);
        assert!(migrations[0].sql.contains("CREATE TABLE users"));
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database in DATABASE_URL"]
    async fn test_create_and_find() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let repo = PgUserRepository::connect(&url, 2).await.unwrap();
        repo.migrate().await.unwrap();

        let username = format!("pg_test_{}", Utc::now().timestamp_nanos_opt().unwrap_or(0));
        let created = repo
            .create(NewUser {
                username: username.clone(),
                password_hash: "hash".to_string(),
                email: "pg@example.com".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();

        let found = repo.find_by_username(&username).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let duplicate = repo
            .create(NewUser {
                username,
                password_hash: "hash".to_string(),
                email: "pg@example.com".to_string(),
                role: Role::User,
            })
            .await;
        assert!(matches!(duplicate, Err(CoreError::Conflict(_))));

        // Migrations are versioned, so a second run is a no-op
        repo.migrate().await.unwrap();
        assert!(repo.list().await.unwrap().iter().any(|u| u.id == created.id));

        let mut missing = found.clone();
        missing.id = i64::MAX;
        assert!(matches!(
            repo.update(&missing).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
