//! Mock annotator for deterministic testing.
//!
//! Available to other crates through the `mock` feature.
//!
//! ```rust,ignore
//! use picbase_inference::mock::MockAnnotator;
//!
//! let annotator = MockAnnotator::new().with_title("Sunset").with_tags(&["sunset"]);
//! assert_eq!(annotator.call_count(), 0);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use picbase_core::{AiSuggestion, AnnotationContext, Error, ImageAnnotator, Result};

/// One recorded `annotate` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub mime_type: String,
    pub size_bytes: usize,
    pub description: Option<String>,
    pub link: Option<String>,
}

/// Annotator returning a fixed suggestion (or a fixed failure).
#[derive(Clone)]
pub struct MockAnnotator {
    suggestion: AiSuggestion,
    failure: Option<String>,
    healthy: bool,
    latency_ms: u64,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnnotator {
    pub fn new() -> Self {
        Self {
            suggestion: AiSuggestion {
                title: Some("Mock title".to_string()),
                description: Some("Mock description of the image.".to_string()),
                caption: Some("Mock caption".to_string()),
                categories: vec!["general".to_string()],
                tags: vec!["mock".to_string()],
            },
            failure: None,
            healthy: true,
            latency_ms: 0,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_suggestion(mut self, suggestion: AiSuggestion) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.suggestion.title = Some(title.to_string());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.suggestion.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.suggestion.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Every `annotate` call fails with `Error::Inference(message)`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self.healthy = false;
        self
    }

    /// Simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ImageAnnotator for MockAnnotator {
    async fn annotate(
        &self,
        image_data: &[u8],
        mime_type: &str,
        context: &AnnotationContext,
    ) -> Result<AiSuggestion> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                mime_type: mime_type.to_string(),
                size_bytes: image_data.len(),
                description: context.description.clone(),
                link: context.link.clone(),
            });

        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }

        match &self.failure {
            Some(message) => Err(Error::Inference(message.clone())),
            None => Ok(self.suggestion.clone()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }

    fn provider(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_configured_suggestion() {
        let mock = MockAnnotator::new()
            .with_title("Harbor")
            .with_tags(&["boats"]);
        let s = mock
            .annotate(b"img", "image/png", &AnnotationContext::default())
            .await
            .unwrap();
        assert_eq!(s.title.as_deref(), Some("Harbor"));
        assert_eq!(s.tags, vec!["boats"]);
    }

    #[tokio::test]
    async fn test_mock_records_calls_across_clones() {
        let mock = MockAnnotator::new();
        let clone = mock.clone();
        clone
            .annotate(
                b"12345",
                "image/jpeg",
                &AnnotationContext {
                    description: Some("beach".to_string()),
                    link: None,
                },
            )
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mime_type, "image/jpeg");
        assert_eq!(calls[0].size_bytes, 5);
        assert_eq!(calls[0].description.as_deref(), Some("beach"));
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockAnnotator::new().failing("quota exceeded");
        let err = mock
            .annotate(b"img", "image/png", &AnnotationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Inference(ref m) if m == "quota exceeded"));
        assert!(!mock.health_check().await.unwrap());
        assert_eq!(mock.call_count(), 1);
    }
}
