//! Error types for picbase.

use thiserror::Error;

/// Result type alias using picbase's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for picbase operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entry not found (or not owned by the caller)
    #[error("Entry not found: {0}")]
    EntryNotFound(uuid::Uuid),

    /// Unique constraint would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// AI annotation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// No AI backend is configured
    #[error("AI unavailable: {0}")]
    AiUnavailable(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload is not one of the accepted image formats
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Upload exceeds the configured size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not allowed)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// Whether this error came from a unique constraint in the store.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            Error::Conflict(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_entry_not_found() {
        let id = Uuid::nil();
        let err = Error::EntryNotFound(id);
        assert_eq!(err.to_string(), format!("Entry not found: {}", id));
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("username taken".to_string());
        assert_eq!(err.to_string(), "Conflict: username taken");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_error_display_upload_errors() {
        let err = Error::UnsupportedMediaType("image/webp".to_string());
        assert_eq!(err.to_string(), "Unsupported media type: image/webp");

        let err = Error::PayloadTooLarge("300 bytes".to_string());
        assert_eq!(err.to_string(), "Payload too large: 300 bytes");
    }

    #[test]
    fn test_error_display_ai() {
        let err = Error::AiUnavailable("no key".to_string());
        assert_eq!(err.to_string(), "AI unavailable: no key");

        let err = Error::Inference("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Inference error: quota exceeded");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
