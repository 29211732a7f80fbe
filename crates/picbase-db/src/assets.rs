//! Asset storage for uploaded image bytes.
//!
//! Entries reference their image by a relative path inside the asset store.
//! The filesystem backend writes atomically (temp file + rename) and stores
//! files without execute permission.
//!
//! ## Example
//!
//! ```rust,ignore
//! use picbase_db::assets::{FilesystemBackend, StorageBackend, generate_asset_path};
//!
//! let backend = FilesystemBackend::new("./uploads");
//! let path = generate_asset_path(&owner_id, &entry_id, "png");
//! backend.write(&path, &bytes).await?;
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use picbase_core::{Error, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage backend trait for different storage implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path, replacing any existing file.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Move data to another path, replacing any file there.
    ///
    /// A missing source is reported as [`Error::NotFound`].
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}

/// Path an asset is parked at while its entry's deletion is being committed.
pub fn pending_delete_path(path: &str) -> String {
    format!("{}.deleting", path)
}

/// Filesystem storage backend rooted at a base directory.
///
/// Path format: `{base_path}/assets/{owner-uuid}/{entry-uuid}.{ext}`
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a relative asset path, refusing anything that escapes the base.
    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::InvalidInput(format!("Invalid asset path: {}", path)));
        }
        Ok(self.base_path.join(relative))
    }

    /// Validate that the storage backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch permission errors and
    /// missing directories early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join("assets/.health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path)?;
        debug!(
            subsystem = "storage",
            component = "filesystem",
            asset_path = %path,
            size_bytes = data.len(),
            "asset write"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "assets: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "assets: File::create failed");
            e
        })?;
        if let Err(e) = file.write_all(data).await {
            warn!(error = %e, "assets: write_all failed");
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "assets: rename failed");
            e
        })?;

        // rw-r--r--, never executable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Asset {} is missing", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.full_path(from)?;
        let to_path = self.full_path(to)?;
        match fs::rename(&from_path, &to_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Asset {} is missing", from)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Compute BLAKE3 hash of data with "blake3:" prefix.
///
/// Returns a string in the format: `blake3:{64-char-hex}`
pub fn compute_content_hash(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    format!("blake3:{}", hash.to_hex())
}

/// Generate the relative asset path for an entry.
///
/// Example: `assets/01948f7e-0000-7000-8000-000000000001/01948f7e-8b2a-7c3d-9e4f-5a6b7c8d9e0f.png`
pub fn generate_asset_path(owner_id: &Uuid, entry_id: &Uuid, extension: &str) -> String {
    format!(
        "assets/{}/{}.{}",
        owner_id.as_hyphenated(),
        entry_id.as_hyphenated(),
        extension
    )
}
