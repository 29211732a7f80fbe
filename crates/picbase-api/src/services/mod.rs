//! Services that sit between HTTP handlers and the repositories.

pub mod catalog;
pub mod image_info;

pub use catalog::{
    analyze_image, create_entry, AiOutcome, AiStatus, Analysis, CreatedEntry, EntryDraft,
    ImageUpload,
};
pub use image_info::image_dimensions;
