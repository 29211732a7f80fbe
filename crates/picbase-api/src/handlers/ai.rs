//! AI annotation handlers.
//!
//! Both endpoints work without a configured provider: status reports it as
//! disabled and analyze answers 503.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use picbase_core::AnnotationContext;

use super::upload::UploadForm;
use super::ErrorBody;
use crate::services::{self, Analysis};
use crate::{ApiError, AppState, RequireAuth};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AiStatusResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Result of a live health check; absent when AI is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

/// Multipart form accepted by `POST /api/v1/ai/analyze` (documentation only).
#[allow(dead_code)]
#[derive(utoipa::ToSchema)]
pub struct AnalyzeForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Extra context for the model.
    pub description: Option<String>,
    /// Related link for the model.
    pub link: Option<String>,
}

/// Whether AI annotation is configured and reachable.
#[utoipa::path(get, path = "/api/v1/ai/status", tag = "AI",
    security(("bearer" = [])),
    responses((status = 200, description = "AI availability", body = AiStatusResponse)))]
pub async fn ai_status(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> Json<AiStatusResponse> {
    let Some(annotator) = state.annotator() else {
        return Json(AiStatusResponse {
            enabled: false,
            provider: None,
            model: None,
            reachable: None,
        });
    };

    let reachable = match annotator.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(
                subsystem = "inference",
                provider = annotator.provider(),
                error = %e,
                "AI health check failed"
            );
            false
        }
    };

    Json(AiStatusResponse {
        enabled: true,
        provider: Some(annotator.provider().to_string()),
        model: Some(annotator.model_name().to_string()),
        reachable: Some(reachable),
    })
}

/// Suggest metadata for an image without creating an entry.
///
/// # Returns
/// - 200 OK with the suggestion
/// - 502 Bad Gateway when the provider call fails
/// - 503 Service Unavailable when no provider is configured
#[utoipa::path(post, path = "/api/v1/ai/analyze", tag = "AI",
    request_body(content = AnalyzeForm, content_type = "multipart/form-data"),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Suggested metadata", body = Analysis),
        (status = 413, description = "Upload too large", body = ErrorBody),
        (status = 415, description = "Unsupported image format", body = ErrorBody),
        (status = 502, description = "AI provider failed", body = ErrorBody),
        (status = 503, description = "AI not configured", body = ErrorBody),
    ))]
pub async fn analyze_image(
    State(state): State<AppState>,
    auth: RequireAuth,
    multipart: Multipart,
) -> Result<Json<Analysis>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let context = AnnotationContext {
        description: form.text("description"),
        link: form.text("link"),
    };

    let analysis = services::analyze_image(
        state.annotator(),
        &form.file,
        &context,
        state.config.max_upload_bytes,
    )
    .await?;

    info!(
        subsystem = "api",
        component = "ai",
        op = "analyze",
        user_id = %auth.user.id,
        provider = %analysis.provider,
        tag_count = analysis.suggestion.tags.len(),
        "Image analyzed"
    );
    Ok(Json(analysis))
}
