//! Entry handlers: search, upload, read, edit, delete and flag flips.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use picbase_core::{
    BulkAction, BulkResult, Entry, EntryPage, EntryRepository, EntrySearch, EntryUpdate, SortKey,
    SortOrder,
};

use super::upload::UploadForm;
use super::{parse_id, ErrorBody};
use crate::services::{self, CreatedEntry};
use crate::{ApiError, AppState, RequireAuth};

/// Largest number of ids accepted by one bulk request.
const BULK_MAX_IDS: usize = 500;

/// Query parameters for listing entries.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEntriesQuery {
    /// Case-insensitive text matched against title, description and notes.
    pub q: Option<String>,
    /// Exact category; `All` or empty disables the filter.
    pub category: Option<String>,
    /// Exact tag; `All` or empty disables the filter.
    pub tag: Option<String>,
    pub favorites_only: Option<bool>,
    pub include_archived: Option<bool>,
    /// `date` (default), `title` or `size`.
    pub sort: Option<String>,
    /// `asc` or `desc`; defaults depend on the sort key.
    pub order: Option<String>,
    /// 1-100, default 12.
    pub page_size: Option<i64>,
    /// 1-based page number.
    pub page: Option<i64>,
}

impl ListEntriesQuery {
    fn into_search(self) -> Result<EntrySearch, ApiError> {
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => SortKey::default(),
            Some(raw) => SortKey::parse(raw).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid sort '{}': expected date, title or size",
                    raw
                ))
            })?,
        };
        let order = match self.order.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(SortOrder::parse(raw).ok_or_else(|| {
                ApiError::BadRequest(format!("Invalid order '{}': expected asc or desc", raw))
            })?),
        };

        Ok(EntrySearch {
            query: self.q,
            category: self.category,
            tag: self.tag,
            favorites_only: self.favorites_only.unwrap_or(false),
            include_archived: self.include_archived.unwrap_or(false),
            sort,
            order,
            page_size: self.page_size,
            page: self.page,
        })
    }
}

/// Multipart form accepted by `POST /api/v1/entries` (documentation only).
#[allow(dead_code)]
#[derive(utoipa::ToSchema)]
pub struct EntryUploadForm {
    /// JPEG, PNG, GIF or BMP image.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Comma-separated or JSON array.
    pub categories: Option<String>,
    /// Comma-separated or JSON array.
    pub tags: Option<String>,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub favorite: Option<bool>,
    pub archived: Option<bool>,
    /// Ask the AI annotator to fill blank fields and add labels.
    pub analyze: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct BulkRequest {
    pub ids: Vec<Uuid>,
    pub action: BulkAction,
}

/// Search, filter, sort and paginate the caller's entries.
#[utoipa::path(get, path = "/api/v1/entries", tag = "Entries",
    params(ListEntriesQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of entries", body = EntryPage),
        (status = 400, description = "Invalid sort or order", body = ErrorBody),
    ))]
pub async fn list_entries(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<EntryPage>, ApiError> {
    let start = Instant::now();
    let search = query.into_search()?;
    let page = state.db.entries.search(auth.user.id, &search).await?;

    debug!(
        subsystem = "api",
        component = "entries",
        op = "search",
        user_id = %auth.user.id,
        query = search.query.as_deref().unwrap_or(""),
        result_count = page.entries.len(),
        total = page.total,
        duration_ms = start.elapsed().as_millis() as u64,
        "Entry search complete"
    );
    Ok(Json(page))
}

/// Upload an image with metadata.
///
/// With `analyze=true` the AI annotator fills blank fields; an unavailable
/// or failing annotator is reported in `ai` and never blocks creation.
///
/// # Returns
/// - 201 Created with the entry and AI outcome
/// - 400 Bad Request when the form is malformed
/// - 413 Payload Too Large above the configured limit
/// - 415 Unsupported Media Type for anything but JPEG, PNG, GIF or BMP
#[utoipa::path(post, path = "/api/v1/entries", tag = "Entries",
    request_body(content = EntryUploadForm, content_type = "multipart/form-data"),
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Entry created", body = CreatedEntry),
        (status = 400, description = "Malformed form", body = ErrorBody),
        (status = 413, description = "Upload too large", body = ErrorBody),
        (status = 415, description = "Unsupported image format", body = ErrorBody),
    ))]
pub async fn create_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedEntry>), ApiError> {
    let form = UploadForm::read(multipart).await?;
    let draft = form.draft()?;
    let analyze = form.flag("analyze")?;

    let created = services::create_entry(
        &state.db,
        state.annotator(),
        auth.user.id,
        draft,
        form.file,
        analyze,
        state.config.max_upload_bytes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Fetch one entry.
#[utoipa::path(get, path = "/api/v1/entries/{id}", tag = "Entries",
    params(("id" = Uuid, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entry", body = Entry),
        (status = 404, description = "Entry not found", body = ErrorBody),
    ))]
pub async fn get_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.db.entries.fetch(auth.user.id, id).await?))
}

/// Partially update an entry.
///
/// Omitted fields are untouched; an empty `title` or `link` clears it; label
/// arrays replace the whole set.
#[utoipa::path(patch, path = "/api/v1/entries/{id}", tag = "Entries",
    params(("id" = Uuid, Path, description = "Entry id")),
    request_body = EntryUpdate,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated entry", body = Entry),
        (status = 400, description = "Empty update", body = ErrorBody),
        (status = 404, description = "Entry not found", body = ErrorBody),
    ))]
pub async fn update_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
    Json(update): Json<EntryUpdate>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_id(&id)?;
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    let entry = state.db.entries.update(auth.user.id, id, update).await?;
    info!(
        subsystem = "api",
        component = "entries",
        op = "update",
        entry_id = %id,
        user_id = %auth.user.id,
        "Entry updated"
    );
    Ok(Json(entry))
}

/// Delete an entry and its image.
#[utoipa::path(delete, path = "/api/v1/entries/{id}", tag = "Entries",
    params(("id" = Uuid, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Entry not found", body = ErrorBody),
    ))]
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.db.entries.delete(auth.user.id, id).await?;
    info!(
        subsystem = "api",
        component = "entries",
        op = "delete",
        entry_id = %id,
        user_id = %auth.user.id,
        "Entry deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Raw image bytes of an entry.
#[utoipa::path(get, path = "/api/v1/entries/{id}/image", tag = "Entries",
    params(("id" = Uuid, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Image bytes with the stored content type"),
        (status = 404, description = "Entry not found", body = ErrorBody),
    ))]
pub async fn get_entry_image(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let (entry, data) = state.db.entries.fetch_image(auth.user.id, id).await?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        entry.original_filename.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, entry.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        Body::from(data),
    )
        .into_response())
}

async fn set_archived(
    state: &AppState,
    owner: Uuid,
    raw_id: &str,
    archived: bool,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_id(raw_id)?;
    let update = EntryUpdate {
        archived: Some(archived),
        ..Default::default()
    };
    Ok(Json(state.db.entries.update(owner, id, update).await?))
}

/// Archive an entry. Archived entries are hidden from default searches.
#[utoipa::path(post, path = "/api/v1/entries/{id}/archive", tag = "Entries",
    params(("id" = Uuid, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Archived entry", body = Entry),
        (status = 404, description = "Entry not found", body = ErrorBody),
    ))]
pub async fn archive_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    set_archived(&state, auth.user.id, &id, true).await
}

/// Restore an archived entry.
#[utoipa::path(post, path = "/api/v1/entries/{id}/unarchive", tag = "Entries",
    params(("id" = Uuid, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Unarchived entry", body = Entry),
        (status = 404, description = "Entry not found", body = ErrorBody),
    ))]
pub async fn unarchive_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    set_archived(&state, auth.user.id, &id, false).await
}

/// Apply one action to several entries.
///
/// Ids that do not exist or belong to someone else come back in `not_found`.
/// Owned entries the action could not be applied to come back in `failed`.
#[utoipa::path(post, path = "/api/v1/entries/bulk", tag = "Entries",
    request_body = BulkRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Bulk outcome", body = BulkResult),
        (status = 400, description = "No ids or too many ids", body = ErrorBody),
    ))]
pub async fn bulk_entries(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<BulkRequest>,
) -> Result<Json<BulkResult>, ApiError> {
    if req.ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".to_string()));
    }
    if req.ids.len() > BULK_MAX_IDS {
        return Err(ApiError::BadRequest(format!(
            "At most {} ids per request",
            BULK_MAX_IDS
        )));
    }

    let result = state
        .db
        .entries
        .bulk(auth.user.id, &req.ids, req.action)
        .await?;
    info!(
        subsystem = "api",
        component = "entries",
        op = "bulk",
        user_id = %auth.user.id,
        action = ?req.action,
        updated = result.updated.len(),
        not_found = result.not_found.len(),
        failed = result.failed.len(),
        "Bulk action applied"
    );
    Ok(Json(result))
}
