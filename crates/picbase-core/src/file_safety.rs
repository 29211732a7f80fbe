//! Upload validation for image files.
//!
//! Two checks, both before anything is persisted:
//! 1. Size limit
//! 2. Magic byte detection against the image allow-list, with the declared
//!    file extension required to agree when one is present

use crate::error::{Error, Result};

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::Bmp,
    ];

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Canonical extension used for stored assets.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Whether a (case-insensitive) file extension names this format.
    pub fn matches_extension(self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        match self {
            ImageFormat::Jpeg => ext == "jpg" || ext == "jpeg",
            other => ext == other.extension(),
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.mime_type() == mime)
    }
}

/// Detect the image format from magic bytes. `None` if not on the allow-list.
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    let kind = infer::get(data)?;
    ImageFormat::from_mime_type(kind.mime_type())
}

/// Extension of a filename, if it has one.
fn file_extension(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Validate an upload and return its detected format.
///
/// Errors:
/// - [`Error::InvalidInput`] for an empty file
/// - [`Error::PayloadTooLarge`] above `max_size_bytes`
/// - [`Error::UnsupportedMediaType`] when the bytes are not JPEG/PNG/GIF/BMP
///   or the extension names a different format
pub fn validate_upload(filename: &str, data: &[u8], max_size_bytes: u64) -> Result<ImageFormat> {
    if data.is_empty() {
        return Err(Error::InvalidInput("Uploaded file is empty".to_string()));
    }

    if data.len() as u64 > max_size_bytes {
        return Err(Error::PayloadTooLarge(format!(
            "File exceeds maximum size of {} bytes",
            max_size_bytes
        )));
    }

    let format = detect_image_format(data).ok_or_else(|| {
        let detected = infer::get(data)
            .map(|k| k.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Error::UnsupportedMediaType(format!(
            "{} is not an accepted image format (jpg, jpeg, png, gif, bmp)",
            detected
        ))
    })?;

    if let Some(ext) = file_extension(filename) {
        if !format.matches_extension(ext) {
            return Err(Error::UnsupportedMediaType(format!(
                "File extension .{} does not match detected {}",
                ext,
                format.mime_type()
            )));
        }
    }

    Ok(format)
}

/// Sanitize an uploaded filename for display and storage in the entry row.
pub fn sanitize_filename(filename: &str) -> String {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "unnamed_image".to_string();
    }

    // Truncate on a char boundary, keeping the extension
    if sanitized.chars().count() > 255 {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            let keep = 255usize.saturating_sub(ext.chars().count());
            let name: String = sanitized[..dot_pos].chars().take(keep).collect();
            return format!("{}{}", name, ext);
        }
        return sanitized.chars().take(255).collect();
    }

    sanitized.to_string()
}
