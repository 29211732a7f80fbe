//! Category and tag listing, renaming and removal.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use picbase_core::{EntryRepository, LabelCount, LabelKind};

use super::ErrorBody;
use crate::{ApiError, AppState, RequireAuth};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RenameLabelRequest {
    /// New label name; merged into an existing label of that name.
    pub name: String,
}

/// Number of entries touched by a rename or removal.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LabelChange {
    pub affected: u64,
}

async fn list(
    state: &AppState,
    auth: &RequireAuth,
    kind: LabelKind,
) -> Result<Json<Vec<LabelCount>>, ApiError> {
    Ok(Json(state.db.entries.list_labels(auth.user.id, kind).await?))
}

async fn rename(
    state: &AppState,
    auth: &RequireAuth,
    kind: LabelKind,
    from: &str,
    to: &str,
) -> Result<Json<LabelChange>, ApiError> {
    let affected = state
        .db
        .entries
        .rename_label(auth.user.id, kind, from, to)
        .await?;
    info!(
        subsystem = "api",
        component = "labels",
        op = "rename",
        user_id = %auth.user.id,
        kind = %kind,
        affected,
        "Label renamed"
    );
    Ok(Json(LabelChange { affected }))
}

async fn remove(
    state: &AppState,
    auth: &RequireAuth,
    kind: LabelKind,
    name: &str,
) -> Result<Json<LabelChange>, ApiError> {
    let affected = state
        .db
        .entries
        .remove_label(auth.user.id, kind, name)
        .await?;
    info!(
        subsystem = "api",
        component = "labels",
        op = "remove",
        user_id = %auth.user.id,
        kind = %kind,
        affected,
        "Label removed"
    );
    Ok(Json(LabelChange { affected }))
}

/// Categories used by the caller's entries, with counts.
#[utoipa::path(get, path = "/api/v1/categories", tag = "Labels",
    security(("bearer" = [])),
    responses((status = 200, description = "Categories sorted by name", body = [LabelCount])))]
pub async fn list_categories(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<LabelCount>>, ApiError> {
    list(&state, &auth, LabelKind::Category).await
}

/// Tags used by the caller's entries, with counts.
#[utoipa::path(get, path = "/api/v1/tags", tag = "Labels",
    security(("bearer" = [])),
    responses((status = 200, description = "Tags sorted by name", body = [LabelCount])))]
pub async fn list_tags(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<LabelCount>>, ApiError> {
    list(&state, &auth, LabelKind::Tag).await
}

/// Rename a category on all the caller's entries.
#[utoipa::path(patch, path = "/api/v1/categories/{name}", tag = "Labels",
    params(("name" = String, Path, description = "Current category name")),
    request_body = RenameLabelRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entries affected", body = LabelChange),
        (status = 400, description = "Blank new name", body = ErrorBody),
        (status = 404, description = "Category not used", body = ErrorBody),
    ))]
pub async fn rename_category(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(name): Path<String>,
    Json(req): Json<RenameLabelRequest>,
) -> Result<Json<LabelChange>, ApiError> {
    rename(&state, &auth, LabelKind::Category, &name, &req.name).await
}

/// Rename a tag on all the caller's entries.
#[utoipa::path(patch, path = "/api/v1/tags/{name}", tag = "Labels",
    params(("name" = String, Path, description = "Current tag name")),
    request_body = RenameLabelRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entries affected", body = LabelChange),
        (status = 400, description = "Blank new name", body = ErrorBody),
        (status = 404, description = "Tag not used", body = ErrorBody),
    ))]
pub async fn rename_tag(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(name): Path<String>,
    Json(req): Json<RenameLabelRequest>,
) -> Result<Json<LabelChange>, ApiError> {
    rename(&state, &auth, LabelKind::Tag, &name, &req.name).await
}

/// Remove a category from all the caller's entries.
#[utoipa::path(delete, path = "/api/v1/categories/{name}", tag = "Labels",
    params(("name" = String, Path, description = "Category name")),
    security(("bearer" = [])),
    responses((status = 200, description = "Entries affected", body = LabelChange)))]
pub async fn delete_category(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<LabelChange>, ApiError> {
    remove(&state, &auth, LabelKind::Category, &name).await
}

/// Remove a tag from all the caller's entries.
#[utoipa::path(delete, path = "/api/v1/tags/{name}", tag = "Labels",
    params(("name" = String, Path, description = "Tag name")),
    security(("bearer" = [])),
    responses((status = 200, description = "Entries affected", body = LabelChange)))]
pub async fn delete_tag(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<LabelChange>, ApiError> {
    remove(&state, &auth, LabelKind::Tag, &name).await
}
