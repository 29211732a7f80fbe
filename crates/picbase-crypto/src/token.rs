//! Session bearer tokens.
//!
//! Tokens are 32 random bytes, URL-safe base64 encoded behind a fixed prefix.
//! Only the SHA-256 hex digest of a token is ever stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix of every issued session token.
pub const TOKEN_PREFIX: &str = "pb_st_";

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a new random session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check before touching the database.
pub fn looks_like_token(token: &str) -> bool {
    token
        .strip_prefix(TOKEN_PREFIX)
        .map(|rest| {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 43);
        assert!(looks_like_token(&token));
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_hash_token_stable() {
        let token = "pb_st_abc";
        assert_eq!(hash_token(token), hash_token(token));
        assert_eq!(hash_token(token).len(), 64);
        assert_ne!(hash_token(token), hash_token("pb_st_abd"));
    }

    #[test]
    fn test_looks_like_token() {
        assert!(!looks_like_token(""));
        assert!(!looks_like_token("pb_st_"));
        assert!(!looks_like_token("Bearer pb_st_abc"));
        assert!(!looks_like_token("pb_st_a b"));
        assert!(looks_like_token("pb_st_a-b_C9"));
    }
}
