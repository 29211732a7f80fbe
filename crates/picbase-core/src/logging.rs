//! Structured logging field names shared by every picbase crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP layer (UUIDv7).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "storage", "inference", "auth"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "entries", "gemini", "ollama", "filesystem"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "search", "annotate", "login"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Entry UUID being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// Owning user UUID.
pub const USER_ID: &str = "user_id";

/// Search query text.
pub const QUERY: &str = "query";

/// Relative asset path in the asset store.
pub const ASSET_PATH: &str = "asset_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or listing.
pub const RESULT_COUNT: &str = "result_count";

/// Size in bytes of an upload or asset.
pub const SIZE_BYTES: &str = "size_bytes";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for annotation.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
