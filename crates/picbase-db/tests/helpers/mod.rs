//! Shared setup for picbase-db integration tests.
//!
//! Every test gets its own temporary directory holding a fresh SQLite file
//! and asset store, so tests never interfere with each other.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use picbase_db::{
    Database, FilesystemBackend, NewEntry, NewUser, PoolConfig, StorageBackend, User,
    UserRepository,
};
use tempfile::TempDir;
use uuid::Uuid;

/// Minimal PNG signature; enough for the asset store, which never decodes.
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

pub struct TestDb {
    pub db: Database,
    pub asset_root: PathBuf,
    _dir: TempDir,
}

impl TestDb {
    pub fn asset_file(&self, relative: &str) -> PathBuf {
        self.asset_root.join(relative)
    }
}

/// Fresh migrated database with a filesystem asset store.
pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let asset_root = dir.path().join("uploads");
    setup_with_storage(dir, asset_root.clone(), Arc::new(FilesystemBackend::new(&asset_root)))
        .await
}

/// Fresh migrated database with a caller-provided storage backend.
pub async fn setup_with_storage(
    dir: TempDir,
    asset_root: PathBuf,
    storage: Arc<dyn StorageBackend>,
) -> TestDb {
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let db = Database::connect_with_config(&url, PoolConfig::new().max_connections(2), storage)
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to run migrations");
    TestDb {
        db,
        asset_root,
        _dir: dir,
    }
}

pub async fn create_user(db: &Database, username: &str) -> User {
    db.users
        .insert(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: format!("{} Tester", username),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        })
        .await
        .expect("Failed to create user")
}

/// Entry request with sensible defaults for the given owner.
pub fn new_entry(owner_id: Uuid) -> NewEntry {
    NewEntry {
        owner_id,
        title: None,
        description: String::new(),
        categories: vec![],
        tags: vec![],
        link: None,
        notes: String::new(),
        favorite: false,
        archived: false,
        original_filename: "photo.png".to_string(),
        content_type: "image/png".to_string(),
        size_bytes: PNG_BYTES.len() as i64,
        width: None,
        height: None,
        caption: None,
    }
}

pub fn titled(owner_id: Uuid, title: &str) -> NewEntry {
    NewEntry {
        title: Some(title.to_string()),
        ..new_entry(owner_id)
    }
}
