//! Multipart form parsing shared by the upload and analyze endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;
use picbase_core::parse_label_input;

use crate::services::{EntryDraft, ImageUpload};
use crate::ApiError;

/// Name of the multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// A parsed upload form: the image plus its text fields.
#[derive(Debug)]
pub struct UploadForm {
    pub file: ImageUpload,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read every part of the form. Exactly one `file` part is required.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut file = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == FILE_FIELD {
                if file.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one file may be uploaded per request".to_string(),
                    ));
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?.to_vec();
                file = Some(ImageUpload { filename, data });
            } else if !name.is_empty() {
                let value = field.text().await?;
                fields.insert(name, value);
            }
        }

        let file = file.ok_or_else(|| {
            ApiError::BadRequest(format!("Missing '{}' field with the image", FILE_FIELD))
        })?;
        Ok(Self { file, fields })
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// Checkbox-style flag: `true`, `1`, `on` and `yes` are true.
    pub fn flag(&self, name: &str) -> Result<bool, ApiError> {
        match self.fields.get(name).map(|v| v.trim().to_lowercase()) {
            None => Ok(false),
            Some(v) => match v.as_str() {
                "true" | "1" | "on" | "yes" => Ok(true),
                "false" | "0" | "off" | "no" | "" => Ok(false),
                _ => Err(ApiError::BadRequest(format!(
                    "Field '{}' must be a boolean",
                    name
                ))),
            },
        }
    }

    pub fn labels(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .map(|v| parse_label_input(v))
            .unwrap_or_default()
    }

    /// Metadata fields of an entry upload.
    pub fn draft(&self) -> Result<EntryDraft, ApiError> {
        Ok(EntryDraft {
            title: self.text("title"),
            description: self.text("description").unwrap_or_default(),
            categories: self.labels("categories"),
            tags: self.labels("tags"),
            link: self.text("link"),
            notes: self.text("notes").unwrap_or_default(),
            favorite: self.flag("favorite")?,
            archived: self.flag("archived")?,
        })
    }
}
