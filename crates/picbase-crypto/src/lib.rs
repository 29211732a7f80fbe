//! # picbase-crypto
//!
//! Credential primitives for picbase.
//!
//! - **Passwords**: Argon2id, stored as PHC strings
//! - **Sessions**: random bearer tokens; only their SHA-256 digest is persisted
//!
//! ## Examples
//!
//! ```rust
//! use picbase_crypto::{hash_password_with, verify_password, PasswordParams};
//!
//! let hash = hash_password_with("Secret123", &PasswordParams::insecure_fast()).unwrap();
//! assert!(verify_password("Secret123", &hash).unwrap());
//! ```
//!
//! ```rust
//! use picbase_crypto::{generate_token, hash_token};
//!
//! let token = generate_token();
//! let stored = hash_token(&token);
//! assert_eq!(stored, hash_token(&token));
//! ```

pub mod error;
pub mod password;
pub mod token;

pub use error::{CryptoError, CryptoResult};
pub use password::{hash_password, hash_password_with, verify_password, PasswordParams};
pub use token::{generate_token, hash_token, looks_like_token, TOKEN_PREFIX};
