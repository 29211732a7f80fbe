//! Core data models for picbase.
//!
//! These types are shared across all picbase crates and represent
//! the core domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// ACCOUNT TYPES
// =============================================================================

/// Public profile of a registered user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// User row together with its stored password hash, used only at login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Request for inserting a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// A login session. Only the SHA-256 hash of the bearer token is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// Whether the session may still authenticate requests at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

// =============================================================================
// ENTRY TYPES
// =============================================================================

/// One cataloged image with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Entry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub notes: String,
    pub favorite: bool,
    pub archived: bool,
    /// Relative path of the image bytes inside the asset store.
    pub asset_path: String,
    pub original_filename: String,
    pub content_type: String,
    /// BLAKE3 hash of the image bytes, formatted as `blake3:<hex>`.
    pub content_hash: String,
    pub size_bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Short AI-provided caption, if annotation ran.
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for inserting a new entry row.
///
/// Label vectors are expected to be normalized already.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub notes: String,
    pub favorite: bool,
    pub archived: bool,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub caption: Option<String>,
}

/// Partial update of an entry. `None` leaves the field untouched.
///
/// An empty `title` or `link` clears the stored value. Label fields replace
/// the whole set.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct EntryUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub favorite: Option<bool>,
    pub archived: Option<bool>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.categories.is_none()
            && self.tags.is_none()
            && self.link.is_none()
            && self.notes.is_none()
            && self.favorite.is_none()
            && self.archived.is_none()
    }
}

// =============================================================================
// SEARCH TYPES
// =============================================================================

/// Sort key for entry search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Title,
    Size,
}

impl SortKey {
    /// Direction used when the caller does not pick one.
    ///
    /// Date sorts newest first, title sorts A-Z, size sorts largest first.
    pub fn default_order(self) -> SortOrder {
        match self {
            SortKey::Date => SortOrder::Desc,
            SortKey::Title => SortOrder::Asc,
            SortKey::Size => SortOrder::Desc,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "date" | "recent" | "created" => Some(SortKey::Date),
            "title" => Some(SortKey::Title),
            "size" => Some(SortKey::Size),
            _ => None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Search/filter/sort/paginate request over one user's entries.
#[derive(Debug, Clone, Default)]
pub struct EntrySearch {
    /// Case-insensitive substring over title, description and notes.
    pub query: Option<String>,
    /// Exact category filter; `All` or empty disables it.
    pub category: Option<String>,
    /// Exact tag filter; `All` or empty disables it.
    pub tag: Option<String>,
    pub favorites_only: bool,
    pub include_archived: bool,
    pub sort: SortKey,
    pub order: Option<SortOrder>,
    pub page_size: Option<i64>,
    pub page: Option<i64>,
}

impl EntrySearch {
    /// Page size clamped to `1..=PAGE_SIZE_MAX`.
    pub fn effective_page_size(&self) -> i64 {
        self.page_size
            .unwrap_or(defaults::PAGE_SIZE)
            .clamp(1, defaults::PAGE_SIZE_MAX)
    }

    /// 1-based page number clamped to `FIRST_PAGE..=PAGE_MAX`.
    pub fn effective_page(&self) -> i64 {
        self.page
            .unwrap_or(defaults::FIRST_PAGE)
            .clamp(defaults::FIRST_PAGE, defaults::PAGE_MAX)
    }

    pub fn offset(&self) -> i64 {
        (self.effective_page() - 1).saturating_mul(self.effective_page_size())
    }

    pub fn effective_order(&self) -> SortOrder {
        self.order.unwrap_or_else(|| self.sort.default_order())
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl EntryPage {
    pub fn new(entries: Vec<Entry>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        Self {
            entries,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

// =============================================================================
// LABEL & STATS TYPES
// =============================================================================

/// Which label set a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Category,
    Tag,
}

impl LabelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKind::Category => "category",
            LabelKind::Tag => "tag",
        }
    }
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A distinct label with the number of entries carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LabelCount {
    pub name: String,
    pub count: i64,
}

/// Per-user catalog statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CatalogStats {
    pub total_entries: i64,
    pub favorites: i64,
    pub archived: i64,
    pub total_bytes: i64,
    pub last_upload: Option<DateTime<Utc>>,
}

// =============================================================================
// BULK TYPES
// =============================================================================

/// Action applied to several entries at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Archive,
    Unarchive,
    Favorite,
    Unfavorite,
    Delete,
}

/// Outcome of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BulkResult {
    pub updated: Vec<Uuid>,
    pub not_found: Vec<Uuid>,
    /// Owned entries the action could not be applied to; they are left unchanged.
    #[serde(default)]
    pub failed: Vec<Uuid>,
}

// =============================================================================
// AI TYPES
// =============================================================================

/// Suggested metadata returned by an image annotator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AiSuggestion {
    pub title: Option<String>,
    pub description: Option<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Extra user-provided context appended to the annotation prompt.
#[derive(Debug, Clone, Default)]
pub struct AnnotationContext {
    pub description: Option<String>,
    pub link: Option<String>,
}
