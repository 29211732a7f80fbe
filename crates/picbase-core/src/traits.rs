//! Core traits for picbase abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::file_safety::ImageFormat;
use crate::models::*;

// =============================================================================
// ACCOUNT REPOSITORY TRAITS
// =============================================================================

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Duplicate username or email yields `Error::Conflict`.
    async fn insert(&self, req: NewUser) -> Result<User>;

    /// Fetch a user by id.
    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    /// Fetch a user and password hash by username (case-sensitive).
    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>>;

    /// Record a successful login.
    async fn touch_last_login(&self, id: Uuid) -> Result<()>;

    /// Activate or deactivate an account.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<()>;
}

/// Repository for login sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session for a hashed bearer token.
    async fn create(&self, user_id: Uuid, token_hash: &str, ttl: Duration) -> Result<Session>;

    /// Look up a session by token hash, regardless of validity.
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Deactivate the session with this token hash. Returns false if none matched.
    async fn deactivate(&self, token_hash: &str) -> Result<bool>;

    /// Remove expired and inactive sessions. Returns the number removed.
    async fn purge_expired(&self) -> Result<u64>;
}

// =============================================================================
// ENTRY REPOSITORY TRAIT
// =============================================================================

/// Repository for catalog entries and their assets.
///
/// Every operation is scoped to `owner`; entries of other users behave as if
/// they did not exist.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Persist the image bytes and insert the entry row.
    ///
    /// If the row insert fails the written asset is removed again.
    async fn insert(&self, req: NewEntry, data: &[u8], format: ImageFormat) -> Result<Entry>;

    /// Fetch one entry.
    async fn fetch(&self, owner: Uuid, id: Uuid) -> Result<Entry>;

    /// Fetch one entry together with its image bytes.
    async fn fetch_image(&self, owner: Uuid, id: Uuid) -> Result<(Entry, Vec<u8>)>;

    /// Search, filter, sort and paginate the owner's entries.
    async fn search(&self, owner: Uuid, req: &EntrySearch) -> Result<EntryPage>;

    /// Apply a partial update. Never touches the asset.
    async fn update(&self, owner: Uuid, id: Uuid, req: EntryUpdate) -> Result<Entry>;

    /// Delete the row and its asset together.
    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()>;

    /// Apply one action to several entries. Unknown ids are reported, not touched.
    async fn bulk(&self, owner: Uuid, ids: &[Uuid], action: BulkAction) -> Result<BulkResult>;

    /// Distinct labels of one kind with entry counts, sorted by name.
    async fn list_labels(&self, owner: Uuid, kind: LabelKind) -> Result<Vec<LabelCount>>;

    /// Rename a label on all the owner's entries, merging into an existing one.
    /// Returns the number of entries affected.
    async fn rename_label(&self, owner: Uuid, kind: LabelKind, from: &str, to: &str)
        -> Result<u64>;

    /// Remove a label from all the owner's entries. Returns the number affected.
    async fn remove_label(&self, owner: Uuid, kind: LabelKind, name: &str) -> Result<u64>;

    /// Aggregate statistics over the owner's entries.
    async fn stats(&self, owner: Uuid) -> Result<CatalogStats>;
}

// =============================================================================
// AI ANNOTATION TRAIT
// =============================================================================

/// Backend that suggests metadata for an image.
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    /// Suggest a title, description and labels for the image.
    async fn annotate(
        &self,
        image_data: &[u8],
        mime_type: &str,
        context: &AnnotationContext,
    ) -> Result<AiSuggestion>;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Provider name, e.g. "gemini" or "ollama".
    fn provider(&self) -> &str;

    /// Model name being used.
    fn model_name(&self) -> &str;
}
