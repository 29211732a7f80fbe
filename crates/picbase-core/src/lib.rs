//! # picbase-core
//!
//! Core types, traits, and abstractions for the picbase image catalog.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other picbase crates depend on.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod labels;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{detect_image_format, sanitize_filename, validate_upload, ImageFormat};
pub use labels::{label_filter, merge_labels, normalize_label, normalize_labels, parse_label_input};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
pub use validation::{validate_signup, SignupInput};
