//! User account repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use picbase_core::{new_v7, Error, NewUser, Result, User, UserCredentials, UserRepository};

use crate::{from_millis, opt_from_millis};

const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, created_at, last_login, is_active";

/// SQLite implementation of [`UserRepository`].
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &SqliteRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            full_name: row.get("full_name"),
            created_at: from_millis(row.get("created_at")),
            last_login: opt_from_millis(row.get("last_login")),
            is_active: row.get("is_active"),
        }
    }

    /// Translate a unique constraint failure into a readable conflict.
    fn map_insert_error(e: sqlx::Error) -> Error {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                let msg = db_err.message();
                if msg.contains("users.email") {
                    return Error::Conflict("Email already registered".to_string());
                }
                return Error::Conflict("Username already exists".to_string());
            }
        }
        Error::Database(e)
    }

    /// Count registered users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, req: NewUser) -> Result<User> {
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, created_at, is_active)
             VALUES (?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.full_name)
        .bind(&req.password_hash)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(Self::map_insert_error)?;

        info!(
            subsystem = "db",
            component = "users",
            op = "insert",
            user_id = %id,
            "User created"
        );

        self.get(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", id)))
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::row_to_user))
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserCredentials {
            user: Self::row_to_user(&row),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now().timestamp_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        debug!(subsystem = "db", component = "users", user_id = %id, "last_login updated");
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User {}", id)));
        }
        Ok(())
    }
}
