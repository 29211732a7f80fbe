//! Password hashing using Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`),
//! so the parameters travel with the hash and can be raised later without
//! invalidating existing accounts.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Argon2id parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory in KiB (default: 19456 = 19 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 2).
    pub iterations: u32,
    /// Parallelism degree (default: 1).
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordParams {
    /// Minimal parameters for tests. Never use for real accounts.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a password with default parameters. Returns a PHC-format string.
pub fn hash_password(password: &str) -> CryptoResult<String> {
    hash_password_with(password, &PasswordParams::default())
}

/// Hash a password with explicit parameters. Returns a PHC-format string.
pub fn hash_password_with(password: &str, params: &PasswordParams) -> CryptoResult<String> {
    if password.is_empty() {
        return Err(CryptoError::InvalidInput("password is empty".to_string()));
    }
    let password = Zeroizing::new(password.as_bytes().to_vec());
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    let hash = params
        .argon2()?
        .hash_password(&password, &salt)
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
///
/// Returns `Ok(false)` on mismatch and `Err` only if the stored hash is malformed.
/// The parameters embedded in the hash are used for verification.
pub fn verify_password(password: &str, phc_hash: &str) -> CryptoResult<bool> {
    let parsed =
        PasswordHash::new(phc_hash).map_err(|e| CryptoError::InvalidHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
