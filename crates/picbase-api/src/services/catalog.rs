//! Entry creation and standalone image analysis.
//!
//! Creation order: validate the upload, read its dimensions, optionally ask
//! the annotator for suggestions, then hand bytes and metadata to the entry
//! repository, which writes the asset before the row.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use picbase_core::{
    merge_labels, sanitize_filename, validate_upload, AiSuggestion, AnnotationContext, Entry,
    EntryRepository, Error, ImageAnnotator, ImageFormat, NewEntry, Result,
};
use picbase_db::Database;

use super::image_info::image_dimensions;

/// Raw uploaded file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// User-supplied metadata for a new entry.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub title: Option<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub notes: String,
    pub favorite: bool,
    pub archived: bool,
}

/// What happened to an AI request made during creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AiStatus {
    /// Suggestions were merged into the entry.
    Applied,
    /// No annotator is configured.
    Unavailable,
    /// The annotator was called and failed.
    Failed,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AiOutcome {
    pub status: AiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<AiSuggestion>,
}

impl AiOutcome {
    fn unavailable() -> Self {
        Self {
            status: AiStatus::Unavailable,
            message: Some("AI analysis is not configured".to_string()),
            provider: None,
            suggestion: None,
        }
    }
}

/// A created entry plus the AI outcome, when analysis was requested.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CreatedEntry {
    pub entry: Entry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiOutcome>,
}

/// Suggestions from a standalone analysis.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Analysis {
    pub provider: String,
    pub model: String,
    pub suggestion: AiSuggestion,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fill blank fields from a suggestion and union its labels after the user's.
fn apply_suggestion(mut draft: EntryDraft, suggestion: &AiSuggestion) -> EntryDraft {
    if draft.title.is_none() {
        draft.title = non_blank(suggestion.title.clone());
    }
    if draft.description.trim().is_empty() {
        if let Some(description) = non_blank(suggestion.description.clone()) {
            draft.description = description;
        }
    }
    draft.categories = merge_labels(&draft.categories, &suggestion.categories);
    draft.tags = merge_labels(&draft.tags, &suggestion.tags);
    draft
}

/// Validate an upload and create the entry, optionally enriched by AI.
///
/// AI problems never block creation; they are reported in the outcome.
pub async fn create_entry(
    db: &Database,
    annotator: Option<&dyn ImageAnnotator>,
    owner: Uuid,
    draft: EntryDraft,
    upload: ImageUpload,
    analyze: bool,
    max_upload_bytes: u64,
) -> Result<CreatedEntry> {
    let start = Instant::now();
    let format = validate_upload(&upload.filename, &upload.data, max_upload_bytes)?;
    let dimensions = image_dimensions(&upload.data);

    let mut draft = EntryDraft {
        title: non_blank(draft.title),
        link: non_blank(draft.link),
        ..draft
    };
    let mut caption = None;

    let ai = if analyze {
        let outcome = match annotator {
            None => AiOutcome::unavailable(),
            Some(annotator) => {
                let context = AnnotationContext {
                    description: Some(draft.description.clone()),
                    link: draft.link.clone(),
                };
                match annotator
                    .annotate(&upload.data, format.mime_type(), &context)
                    .await
                {
                    Ok(suggestion) => {
                        draft = apply_suggestion(draft, &suggestion);
                        caption = non_blank(suggestion.caption.clone());
                        AiOutcome {
                            status: AiStatus::Applied,
                            message: None,
                            provider: Some(annotator.provider().to_string()),
                            suggestion: Some(suggestion),
                        }
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "api",
                            component = "catalog",
                            op = "create",
                            user_id = %owner,
                            error = %e,
                            "AI analysis failed, creating entry without suggestions"
                        );
                        AiOutcome {
                            status: AiStatus::Failed,
                            message: Some(e.to_string()),
                            provider: Some(annotator.provider().to_string()),
                            suggestion: None,
                        }
                    }
                }
            }
        };
        Some(outcome)
    } else {
        None
    };

    let new_entry = NewEntry {
        owner_id: owner,
        title: draft.title,
        description: draft.description,
        categories: draft.categories,
        tags: draft.tags,
        link: draft.link,
        notes: draft.notes,
        favorite: draft.favorite,
        archived: draft.archived,
        original_filename: sanitize_filename(&upload.filename),
        content_type: format.mime_type().to_string(),
        size_bytes: upload.data.len() as i64,
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
        caption,
    };
    let entry = db.entries.insert(new_entry, &upload.data, format).await?;

    info!(
        subsystem = "api",
        component = "catalog",
        op = "create",
        entry_id = %entry.id,
        user_id = %owner,
        size_bytes = entry.size_bytes,
        ai_status = ?ai.as_ref().map(|a| a.status),
        duration_ms = start.elapsed().as_millis() as u64,
        "Entry created from upload"
    );

    Ok(CreatedEntry { entry, ai })
}

/// Validate an upload and return AI suggestions without storing anything.
pub async fn analyze_image(
    annotator: Option<&dyn ImageAnnotator>,
    upload: &ImageUpload,
    context: &AnnotationContext,
    max_upload_bytes: u64,
) -> Result<Analysis> {
    let format: ImageFormat = validate_upload(&upload.filename, &upload.data, max_upload_bytes)?;
    let annotator = annotator
        .ok_or_else(|| Error::AiUnavailable("AI analysis is not configured".to_string()))?;

    let suggestion = annotator
        .annotate(&upload.data, format.mime_type(), context)
        .await?;

    Ok(Analysis {
        provider: annotator.provider().to_string(),
        model: annotator.model_name().to_string(),
        suggestion,
    })
}
