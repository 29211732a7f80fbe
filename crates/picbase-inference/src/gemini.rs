//! Google Gemini annotation backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use picbase_core::defaults::{AI_TIMEOUT_SECS, GEMINI_BASE_URL, GEMINI_MODEL};
use picbase_core::{AiSuggestion, AnnotationContext, Error, ImageAnnotator, Result};

use crate::parse::parse_suggestion;
use crate::prompt::build_prompt;

/// Header carrying the API key, kept out of URLs so it never reaches logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for [`GeminiAnnotator`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs: AI_TIMEOUT_SECS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Annotates images through the Gemini `generateContent` endpoint.
pub struct GeminiAnnotator {
    client: Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiAnnotator {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "gemini",
            model = %config.model,
            timeout_secs = config.timeout_secs,
            "Initializing Gemini annotator"
        );

        Ok(Self { client, config })
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.config.base_url, self.config.model)
    }

    /// Concatenated text of the first candidate.
    fn response_text(response: GenerateResponse) -> Result<String> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::Inference(
                "Gemini returned no candidate text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl ImageAnnotator for GeminiAnnotator {
    async fn annotate(
        &self,
        image_data: &[u8],
        mime_type: &str,
        context: &AnnotationContext,
    ) -> Result<AiSuggestion> {
        let start = Instant::now();
        let prompt = build_prompt(context);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: &prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: base64::engine::general_purpose::STANDARD.encode(image_data),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let url = format!("{}:generateContent", self.model_url());
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "failed" };
                Error::Inference(format!("Gemini request {}: {}", reason, e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            warn!(
                subsystem = "inference",
                component = "gemini",
                op = "annotate",
                status = status.as_u16(),
                "Gemini returned an error"
            );
            return Err(Error::Inference(format!(
                "Gemini API returned {}: {}",
                status, message
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse Gemini response: {}", e)))?;
        let suggestion = parse_suggestion(&Self::response_text(body)?)?;

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "annotate",
            model = %self.config.model,
            size_bytes = image_data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Image annotated"
        );
        Ok(suggestion)
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.model_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn provider(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
