//! Login session repository.
//!
//! Sessions are looked up by the SHA-256 hash of the bearer token; the raw
//! token never reaches the database.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use picbase_core::{new_v7, Result, Session, SessionRepository};

use crate::from_millis;

/// SQLite implementation of [`SessionRepository`].
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: &SqliteRow) -> Session {
        Session {
            id: row.get("id"),
            user_id: row.get("user_id"),
            created_at: from_millis(row.get("created_at")),
            expires_at: from_millis(row.get("expires_at")),
            is_active: row.get("is_active"),
        }
    }

    /// Deactivate every session of a user. Returns the number deactivated.
    pub async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result =
            sqlx::query("UPDATE user_sessions SET is_active = 0 WHERE user_id = ? AND is_active = 1")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, user_id: Uuid, token_hash: &str, ttl: Duration) -> Result<Session> {
        let session = Session {
            id: new_v7(),
            user_id,
            created_at: Utc::now(),
            expires_at: Utc::now() + ttl,
            is_active: true,
        };

        sqlx::query(
            "INSERT INTO user_sessions (id, user_id, token_hash, created_at, expires_at, is_active)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(session.id)
        .bind(user_id)
        .bind(token_hash)
        .bind(session.created_at.timestamp_millis())
        .bind(session.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        debug!(
            subsystem = "db",
            component = "sessions",
            op = "create",
            user_id = %user_id,
            "Session created"
        );

        // Round-trip through millis so the returned value equals a later fetch.
        Ok(Session {
            created_at: from_millis(session.created_at.timestamp_millis()),
            expires_at: from_millis(session.expires_at.timestamp_millis()),
            ..session
        })
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at, expires_at, is_active
             FROM user_sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::row_to_session))
    }

    async fn deactivate(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = 0 WHERE token_hash = ? AND is_active = 1",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM user_sessions WHERE expires_at <= ? OR is_active = 0")
                .bind(Utc::now().timestamp_millis())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() > 0 {
            debug!(
                subsystem = "db",
                component = "sessions",
                op = "purge",
                result_count = result.rows_affected(),
                "Purged stale sessions"
            );
        }
        Ok(result.rows_affected())
    }
}
