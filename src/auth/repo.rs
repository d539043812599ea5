use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt, never leaves the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub admin_users: i64,
    pub new_users_last7_days: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    /// Returns false when no user has that id.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn stats(&self, since: OffsetDateTime) -> Result<UserStats, StoreError>;
}

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn stats(&self, since: OffsetDateTime) -> Result<UserStats, StoreError> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT COUNT(*)                                  AS total_users,
                   COUNT(*) FILTER (WHERE role = 'admin')    AS admin_users,
                   COUNT(*) FILTER (WHERE created_at >= $1)  AS new_users_last7_days
            FROM users
            "#,
        )
        .bind(since)
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }
}
