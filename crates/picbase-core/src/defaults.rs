//! Centralized default constants for picbase.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Environment variables override most of them at startup.

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8501;

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default SQLite database location.
pub const DATABASE_URL: &str = "sqlite://picbase.db";

/// Default directory for uploaded image bytes.
pub const ASSET_STORAGE_PATH: &str = "uploads";

/// Default login attempts allowed per minute across the server.
pub const LOGIN_RATE_LIMIT_PER_MINUTE: u32 = 20;

// =============================================================================
// UPLOADS
// =============================================================================

/// Default maximum upload size in MiB.
pub const MAX_UPLOAD_MB: u64 = 200;

/// Bytes per MiB.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for entry search.
pub const PAGE_SIZE: i64 = 12;

/// Largest page size a caller may request.
pub const PAGE_SIZE_MAX: i64 = 100;

/// First page number (pages are 1-based).
pub const FIRST_PAGE: i64 = 1;

/// Highest page number accepted; larger requests are clamped to it.
pub const PAGE_MAX: i64 = 1_000_000;

// =============================================================================
// LABELS
// =============================================================================

/// Maximum characters in a single category or tag.
pub const LABEL_MAX_LEN: usize = 100;

/// Filter value that disables a category/tag filter.
pub const LABEL_FILTER_ALL: &str = "All";

// =============================================================================
// SESSIONS
// =============================================================================

/// Default session lifetime in hours (7 days).
pub const SESSION_TTL_HOURS: i64 = 168;

/// Longest configurable session lifetime in hours (one year).
pub const SESSION_TTL_HOURS_MAX: i64 = 24 * 366;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default timeout for a single AI annotation call.
pub const AI_TIMEOUT_SECS: u64 = 60;

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model.
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default Ollama URL.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Environment variable selecting the AI provider.
pub const ENV_AI_PROVIDER: &str = "AI_PROVIDER";

/// Environment variable holding the Gemini API key.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Environment variable naming the Ollama vision model.
pub const ENV_OLLAMA_VISION_MODEL: &str = "OLLAMA_VISION_MODEL";

/// Maximum number of categories kept from an AI suggestion.
pub const AI_MAX_CATEGORIES: usize = 5;

/// Maximum caption length taken from free-text AI output.
pub const AI_CAPTION_MAX_LEN: usize = 100;
