//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Stored hash is not a valid PHC string.
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    /// Invalid hashing parameters.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
