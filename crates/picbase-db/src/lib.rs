//! # picbase-db
//!
//! SQLite database layer for picbase.
//!
//! This crate provides:
//! - Connection pool management (WAL mode, foreign keys on)
//! - Embedded migrations
//! - Repository implementations for users, sessions and entries
//! - Search/filter query building for entries
//! - Filesystem asset storage for image bytes
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use picbase_db::{Database, FilesystemBackend, EntrySearch, EntryRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://picbase.db", Arc::new(FilesystemBackend::new("uploads"))).await?;
//!     db.migrate().await?;
//!
//!     let page = db.entries.search(user_id, &EntrySearch::default()).await?;
//!     println!("{} entries", page.total);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub mod assets;
pub mod entries;
pub mod filter;
pub mod pool;
pub mod sessions;
pub mod users;

// Re-export core types
pub use picbase_core::*;

pub use assets::{compute_content_hash, generate_asset_path, FilesystemBackend, StorageBackend};
pub use entries::SqliteEntryRepository;
pub use filter::{escape_like, EntryFilterQueryBuilder, QueryParam};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use sessions::SqliteSessionRepository;
pub use users::SqliteUserRepository;

/// Convert stored epoch milliseconds to a UTC timestamp.
pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub(crate) fn opt_from_millis(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::from_timestamp_millis)
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::SqlitePool,
    /// User account repository.
    pub users: SqliteUserRepository,
    /// Login session repository.
    pub sessions: SqliteSessionRepository,
    /// Entry repository (rows, labels and assets).
    pub entries: SqliteEntryRepository,
    /// Asset storage backend shared with the entry repository.
    pub storage: Arc<dyn StorageBackend>,
}

impl Database {
    /// Create a new Database instance from a pool and an asset backend.
    pub fn new(pool: sqlx::SqlitePool, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            users: SqliteUserRepository::new(pool.clone()),
            sessions: SqliteSessionRepository::new(pool.clone()),
            entries: SqliteEntryRepository::new(pool.clone(), storage.clone()),
            storage,
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool, storage))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(
        url: &str,
        config: PoolConfig,
        storage: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool, storage))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Check the database answers queries, logging pool metrics on the way.
    pub async fn health_check(&self) -> Result<bool> {
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        log_pool_metrics(&self.pool);
        Ok(one == 1)
    }
}
