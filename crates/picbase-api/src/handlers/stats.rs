use axum::{extract::State, Json};

use picbase_core::{CatalogStats, EntryRepository};

use crate::{ApiError, AppState, RequireAuth};

/// Totals over the caller's catalog.
#[utoipa::path(get, path = "/api/v1/stats", tag = "Entries",
    security(("bearer" = [])),
    responses((status = 200, description = "Catalog statistics", body = CatalogStats)))]
pub async fn get_stats(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<CatalogStats>, ApiError> {
    Ok(Json(state.db.entries.stats(auth.user.id).await?))
}
