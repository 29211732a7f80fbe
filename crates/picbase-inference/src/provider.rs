//! Annotator selection from configuration.
//!
//! `AI_PROVIDER` picks the backend explicitly (`gemini`, `ollama` or `none`).
//! When it is unset, Gemini is used if `GEMINI_API_KEY` is present, otherwise
//! Ollama if `OLLAMA_VISION_MODEL` is present, otherwise AI is disabled.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use picbase_core::defaults::{
    AI_TIMEOUT_SECS, ENV_AI_PROVIDER, ENV_GEMINI_API_KEY, ENV_OLLAMA_VISION_MODEL,
    GEMINI_BASE_URL, GEMINI_MODEL, OLLAMA_URL,
};
use picbase_core::{Error, ImageAnnotator, Result};

use crate::gemini::{GeminiAnnotator, GeminiConfig};
use crate::ollama::OllamaVisionAnnotator;

/// Supported annotation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    Ollama,
    None,
}

impl FromStr for AiProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "ollama" => Ok(AiProvider::Ollama),
            "none" | "off" | "disabled" | "" => Ok(AiProvider::None),
            other => Err(Error::Config(format!(
                "Unknown {} '{}': expected gemini, ollama or none",
                ENV_AI_PROVIDER, other
            ))),
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AiProvider::Gemini => "gemini",
            AiProvider::Ollama => "ollama",
            AiProvider::None => "none",
        })
    }
}

/// AI settings read from the environment.
#[derive(Clone, Default)]
pub struct AiConfig {
    pub provider: Option<AiProvider>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub ollama_base: Option<String>,
    pub ollama_vision_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("provider", &self.provider)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("ollama_base", &self.ollama_base)
            .field("ollama_vision_model", &self.ollama_vision_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AiConfig {
    /// Read settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = get(ENV_AI_PROVIDER)
            .map(|v| v.parse::<AiProvider>())
            .transpose()?;
        let timeout_secs = get("AI_TIMEOUT_SECS")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("Invalid AI_TIMEOUT_SECS '{}'", v)))
            })
            .transpose()?;

        Ok(Self {
            provider,
            gemini_api_key: get(ENV_GEMINI_API_KEY),
            gemini_model: get("GEMINI_MODEL"),
            gemini_base_url: get("GEMINI_BASE_URL"),
            ollama_base: get("OLLAMA_BASE").or_else(|| get("OLLAMA_URL")),
            ollama_vision_model: get(ENV_OLLAMA_VISION_MODEL),
            timeout_secs,
        })
    }

    /// The provider that will actually be used.
    pub fn resolved_provider(&self) -> AiProvider {
        match self.provider {
            Some(provider) => provider,
            None if self.gemini_api_key.is_some() => AiProvider::Gemini,
            None if self.ollama_vision_model.is_some() => AiProvider::Ollama,
            None => AiProvider::None,
        }
    }

    fn timeout(&self) -> u64 {
        self.timeout_secs.unwrap_or(AI_TIMEOUT_SECS)
    }
}

/// Build the configured annotator, or `None` when AI is disabled.
///
/// A provider chosen explicitly but missing its credential or model logs a
/// warning and disables AI rather than failing startup.
pub fn build_annotator(config: &AiConfig) -> Result<Option<Arc<dyn ImageAnnotator>>> {
    let annotator: Option<Arc<dyn ImageAnnotator>> = match config.resolved_provider() {
        AiProvider::Gemini => match &config.gemini_api_key {
            Some(key) => {
                let gemini = GeminiConfig::new(key.clone())
                    .with_model(
                        config
                            .gemini_model
                            .clone()
                            .unwrap_or_else(|| GEMINI_MODEL.to_string()),
                    )
                    .with_base_url(
                        config
                            .gemini_base_url
                            .clone()
                            .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
                    )
                    .with_timeout_secs(config.timeout());
                Some(Arc::new(GeminiAnnotator::new(gemini)?))
            }
            None => {
                warn!(
                    subsystem = "inference",
                    "AI provider is gemini but {} is not set; AI features disabled",
                    ENV_GEMINI_API_KEY
                );
                None
            }
        },
        AiProvider::Ollama => match &config.ollama_vision_model {
            Some(model) => Some(Arc::new(OllamaVisionAnnotator::with_timeout(
                config
                    .ollama_base
                    .clone()
                    .unwrap_or_else(|| OLLAMA_URL.to_string()),
                model.clone(),
                config.timeout(),
            )?)),
            None => {
                warn!(
                    subsystem = "inference",
                    "AI provider is ollama but {} is not set; AI features disabled",
                    ENV_OLLAMA_VISION_MODEL
                );
                None
            }
        },
        AiProvider::None => None,
    };

    match &annotator {
        Some(a) => info!(
            subsystem = "inference",
            provider = a.provider(),
            model = a.model_name(),
            "AI annotation enabled"
        ),
        None => info!(subsystem = "inference", "AI annotation disabled"),
    }
    Ok(annotator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AiConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("Gemini".parse::<AiProvider>().unwrap(), AiProvider::Gemini);
        assert_eq!("ollama".parse::<AiProvider>().unwrap(), AiProvider::Ollama);
        assert_eq!("none".parse::<AiProvider>().unwrap(), AiProvider::None);
        assert!("openai".parse::<AiProvider>().is_err());
    }

    #[test]
    fn test_nothing_configured_disables_ai() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.resolved_provider(), AiProvider::None);
        assert!(build_annotator(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_gemini_key_selects_gemini() {
        let cfg = config(&[("GEMINI_API_KEY", "k"), ("OLLAMA_VISION_MODEL", "llava")]).unwrap();
        assert_eq!(cfg.resolved_provider(), AiProvider::Gemini);
        let annotator = build_annotator(&cfg).unwrap().unwrap();
        assert_eq!(annotator.provider(), "gemini");
        assert_eq!(annotator.model_name(), GEMINI_MODEL);
    }

    #[test]
    fn test_ollama_model_selects_ollama() {
        let cfg = config(&[("OLLAMA_VISION_MODEL", "llava")]).unwrap();
        let annotator = build_annotator(&cfg).unwrap().unwrap();
        assert_eq!(annotator.provider(), "ollama");
        assert_eq!(annotator.model_name(), "llava");
    }

    #[test]
    fn test_explicit_provider_without_credential_disables_ai() {
        let cfg = config(&[("AI_PROVIDER", "gemini"), ("OLLAMA_VISION_MODEL", "llava")]).unwrap();
        assert!(build_annotator(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_explicit_none_wins() {
        let cfg = config(&[("AI_PROVIDER", "none"), ("GEMINI_API_KEY", "k")]).unwrap();
        assert!(build_annotator(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config(&[("AI_PROVIDER", "skynet")]).is_err());
        assert!(config(&[("AI_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let cfg = config(&[("GEMINI_API_KEY", "secret-key")]).unwrap();
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("***"));
    }
}
