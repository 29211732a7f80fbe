//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    pub version: String,
    pub database: bool,
    pub ai_enabled: bool,
}

/// Report service health.
///
/// Answers 503 when the database does not respond.
#[utoipa::path(get, path = "/health", tag = "System",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unavailable", body = HealthResponse),
    ))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.db.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::error!(subsystem = "api", error = %e, "Database health check failed");
            false
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            ai_enabled: state.annotator.is_some(),
        }),
    )
}
