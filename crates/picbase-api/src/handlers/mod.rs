//! HTTP handlers for picbase-api.

pub mod ai;
pub mod auth;
pub mod entries;
pub mod health;
pub mod labels;
pub mod stats;
pub mod upload;

use serde::Serialize;
use uuid::Uuid;

use crate::ApiError;

/// Body of every error response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Parse an entry id from the path, answering 400 in the API's error shape.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid entry id '{}'", raw)))
}
