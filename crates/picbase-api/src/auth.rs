//! Bearer-token authentication.
//!
//! Clients send `Authorization: Bearer <token>`. The token is hashed with
//! SHA-256 and looked up in the session table; the raw token is never stored.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;

use picbase_core::{SessionRepository, User, UserRepository};
use picbase_crypto::{hash_token, looks_like_token};

use crate::{ApiError, AppState};

/// Extractor that requires a valid, active session.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub user: User,
    /// SHA-256 hash of the presented token, used to end the session at logout.
    pub token_hash: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        if !looks_like_token(token) {
            return Err(ApiError::Unauthorized("Invalid session token".to_string()));
        }

        let token_hash = hash_token(token);
        let session = state
            .db
            .sessions
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))?;

        if !session.is_valid_at(Utc::now()) {
            return Err(ApiError::Unauthorized(
                "Session expired, please log in again".to_string(),
            ));
        }

        let user = state
            .db
            .users
            .get(session.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))?;

        if !user.is_active {
            return Err(ApiError::Forbidden("Account is deactivated".to_string()));
        }

        Ok(RequireAuth { user, token_hash })
    }
}
