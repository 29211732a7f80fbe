//! Image header inspection.

use std::io::Cursor;

use image::ImageReader;

/// Pixel dimensions read from the image header.
///
/// Returns `None` when the header cannot be decoded; the entry is still stored.
pub fn image_dimensions(data: &[u8]) -> Option<(i64, i64)> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok((width, height)) => Some((i64::from(width), i64::from(height))),
        Err(e) => {
            tracing::debug!(error = %e, "Image dimensions unavailable");
            None
        }
    }
}
