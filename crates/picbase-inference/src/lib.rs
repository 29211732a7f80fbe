//! # picbase-inference
//!
//! AI image annotation backends for picbase.
//!
//! This crate provides:
//! - Gemini `generateContent` backend (inline base64 image data)
//! - Ollama vision backend (`/api/generate` with images)
//! - Prompt construction with optional user context
//! - Response parsing with a keyword heuristic fallback
//! - Provider selection from the environment
//!
//! # Feature Flags
//!
//! - `mock`: expose [`mock::MockAnnotator`] to other crates' tests
//!
//! # Example
//!
//! ```rust,no_run
//! use picbase_inference::{build_annotator, AiConfig, AnnotationContext, ImageAnnotator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AiConfig::from_env()?;
//!     if let Some(annotator) = build_annotator(&config)? {
//!         let bytes = std::fs::read("photo.jpg")?;
//!         let suggestion = annotator
//!             .annotate(&bytes, "image/jpeg", &AnnotationContext::default())
//!             .await?;
//!         println!("{:?}", suggestion.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod gemini;
pub mod ollama;
pub mod parse;
pub mod prompt;
pub mod provider;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use picbase_core::*;

pub use gemini::{GeminiAnnotator, GeminiConfig};
pub use ollama::OllamaVisionAnnotator;
pub use parse::{extract_caption, extract_categories, heuristic_suggestion, parse_suggestion};
pub use prompt::build_prompt;
pub use provider::{build_annotator, AiConfig, AiProvider};
