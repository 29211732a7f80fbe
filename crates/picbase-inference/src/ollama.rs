//! Ollama vision annotation backend (e.g. llava, qwen2.5vl).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use picbase_core::defaults::{AI_TIMEOUT_SECS, OLLAMA_URL};
use picbase_core::{AiSuggestion, AnnotationContext, Error, ImageAnnotator, Result};

use crate::parse::parse_suggestion;
use crate::prompt::build_prompt;

/// Annotates images through Ollama's `/api/generate` endpoint.
pub struct OllamaVisionAnnotator {
    base_url: String,
    model: String,
    client: Client,
    timeout_secs: u64,
}

impl OllamaVisionAnnotator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, model, AI_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "ollama",
            model = %model,
            "Initializing Ollama vision annotator: url={}",
            base_url
        );

        Ok(Self {
            base_url,
            model,
            client,
            timeout_secs,
        })
    }

    /// Default local endpoint with the given model.
    pub fn local(model: impl Into<String>) -> Result<Self> {
        Self::new(OLLAMA_URL, model)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    images: Vec<String>, // base64 encoded
    format: &'static str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl ImageAnnotator for OllamaVisionAnnotator {
    async fn annotate(
        &self,
        image_data: &[u8],
        _mime_type: &str,
        context: &AnnotationContext,
    ) -> Result<AiSuggestion> {
        let start = Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(context),
            images: vec![base64::engine::general_purpose::STANDARD.encode(image_data)],
            format: "json",
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "failed" };
                Error::Inference(format!("Vision request {}: {}", reason, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse vision response: {}", e)))?;
        let suggestion = parse_suggestion(&result.response)?;

        debug!(
            subsystem = "inference",
            component = "ollama",
            op = "annotate",
            model = %self.model,
            size_bytes = image_data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Image annotated"
        );
        Ok(suggestion)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn provider(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
