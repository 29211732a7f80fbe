//! Turn free-form model output into an [`AiSuggestion`].
//!
//! Models are asked for a JSON object but do not always comply. The parser
//! accepts bare JSON, JSON inside a fenced code block, or JSON surrounded by
//! prose. Anything else is treated as a plain description and mined for a
//! caption and keyword categories.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use picbase_core::defaults::{AI_CAPTION_MAX_LEN, AI_MAX_CATEGORIES};
use picbase_core::{normalize_labels, parse_label_input, AiSuggestion, Error, Result};

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid fence regex")
});

/// Category keyword table used when the model did not return JSON.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "nature",
        &["tree", "flower", "plant", "landscape", "mountain", "water", "sky", "outdoor"],
    ),
    ("people", &["person", "people", "human", "face", "portrait", "group"]),
    ("animal", &["dog", "cat", "bird", "animal", "pet", "wildlife"]),
    ("food", &["food", "meal", "cooking", "restaurant", "kitchen", "eating"]),
    (
        "technology",
        &["computer", "phone", "device", "screen", "technology", "digital"],
    ),
    ("vehicle", &["car", "truck", "bike", "plane", "vehicle", "transportation"]),
    ("building", &["building", "house", "architecture", "structure", "urban"]),
    ("art", &["painting", "artwork", "drawing", "artistic", "creative"]),
    ("sport", &["sport", "game", "playing", "exercise", "athletic"]),
    ("indoor", &["indoor", "inside", "room", "interior"]),
    ("outdoor", &["outdoor", "outside", "exterior", "landscape"]),
];

/// Category used when no keyword matched.
pub const FALLBACK_CATEGORY: &str = "general";

/// Labels may come back as an array or as one comma-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelField {
    List(Vec<String>),
    Text(String),
}

impl LabelField {
    fn into_labels(self) -> Vec<String> {
        match self {
            LabelField::List(items) => normalize_labels(items),
            LabelField::Text(text) => parse_label_input(&text),
        }
    }
}

#[derive(Deserialize)]
struct RawSuggestion {
    title: Option<String>,
    description: Option<String>,
    caption: Option<String>,
    categories: Option<LabelField>,
    tags: Option<LabelField>,
}

/// Parse model output into a suggestion.
///
/// Only empty output is an error; unparsable text falls back to heuristics.
pub fn parse_suggestion(text: &str) -> Result<AiSuggestion> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Inference("Model returned an empty response".to_string()));
    }

    match extract_json(text) {
        Some(raw) => Ok(from_raw(raw)),
        None => Ok(heuristic_suggestion(text)),
    }
}

fn extract_json(text: &str) -> Option<RawSuggestion> {
    if let Ok(raw) = serde_json::from_str::<RawSuggestion>(text) {
        return Some(raw);
    }
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Ok(raw) = serde_json::from_str::<RawSuggestion>(&captures[1]) {
            return Some(raw);
        }
    }
    // Object embedded in prose.
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<RawSuggestion>(&text[start..=end]).ok()
}

fn from_raw(raw: RawSuggestion) -> AiSuggestion {
    let mut categories = raw
        .categories
        .map(LabelField::into_labels)
        .unwrap_or_default();
    categories.truncate(AI_MAX_CATEGORIES);

    AiSuggestion {
        title: clean(raw.title),
        description: clean(raw.description),
        caption: clean(raw.caption),
        categories,
        tags: raw.tags.map(LabelField::into_labels).unwrap_or_default(),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build a suggestion from plain prose.
pub fn heuristic_suggestion(text: &str) -> AiSuggestion {
    let caption = extract_caption(text);
    AiSuggestion {
        title: caption.clone(),
        description: Some(text.trim().to_string()),
        caption,
        categories: extract_categories(text),
        tags: Vec::new(),
    }
}

/// Keyword-matched categories, at most five, `general` when nothing matched.
pub fn extract_categories(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<String> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| category.to_string())
        .take(AI_MAX_CATEGORIES)
        .collect();
    if found.is_empty() {
        found.push(FALLBACK_CATEGORY.to_string());
    }
    found
}

/// First sentence longer than ten characters, cut to the caption limit.
pub fn extract_caption(text: &str) -> Option<String> {
    let sentence = text
        .split('.')
        .map(str::trim)
        .find(|s| s.chars().count() > 10)?;

    if sentence.chars().count() > AI_CAPTION_MAX_LEN {
        let cut: String = sentence.chars().take(AI_CAPTION_MAX_LEN).collect();
        Some(format!("{}...", cut.trim_end()))
    } else {
        Some(sentence.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_json() {
        let text = r#"{"title": "Sunset", "description": "Orange sky over hills.",
            "caption": "Evening glow", "categories": ["Nature"], "tags": ["Sunset", "hills"]}"#;
        let s = parse_suggestion(text).unwrap();
        assert_eq!(s.title.as_deref(), Some("Sunset"));
        assert_eq!(s.description.as_deref(), Some("Orange sky over hills."));
        assert_eq!(s.caption.as_deref(), Some("Evening glow"));
        assert_eq!(s.categories, vec!["nature"]);
        assert_eq!(s.tags, vec!["sunset", "hills"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here you go:\n```json\n{\"title\": \"Cat\", \"tags\": \"cat, pet\"}\n```\n";
        let s = parse_suggestion(text).unwrap();
        assert_eq!(s.title.as_deref(), Some("Cat"));
        assert_eq!(s.tags, vec!["cat", "pet"]);
        assert!(s.categories.is_empty());
        assert!(s.description.is_none());
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = "Sure! {\"title\": \"Bridge\", \"categories\": [\"building\"]} Hope this helps.";
        let s = parse_suggestion(text).unwrap();
        assert_eq!(s.title.as_deref(), Some("Bridge"));
        assert_eq!(s.categories, vec!["building"]);
    }

    #[test]
    fn test_json_categories_capped() {
        let text = r#"{"categories": ["a", "b", "c", "d", "e", "f", "g"]}"#;
        let s = parse_suggestion(text).unwrap();
        assert_eq!(s.categories.len(), 5);
    }

    #[test]
    fn test_blank_json_fields_become_none() {
        let s = parse_suggestion(r#"{"title": "  ", "description": ""}"#).unwrap();
        assert!(s.title.is_none());
        assert!(s.description.is_none());
    }

    #[test]
    fn test_empty_response_is_error() {
        assert!(matches!(parse_suggestion("  \n"), Err(Error::Inference(_))));
    }

    #[test]
    fn test_prose_falls_back_to_heuristics() {
        let text = "A dog runs. A golden retriever plays on the grass near a tree. Bright day.";
        let s = parse_suggestion(text).unwrap();
        assert_eq!(
            s.caption.as_deref(),
            Some("A golden retriever plays on the grass near a tree")
        );
        assert_eq!(s.title, s.caption);
        assert_eq!(s.description.as_deref(), Some(text));
        assert_eq!(s.categories, vec!["nature", "animal"]);
        assert!(s.tags.is_empty());
    }

    #[test]
    fn test_categories_default_to_general() {
        assert_eq!(extract_categories("Abstract shapes"), vec!["general"]);
    }

    #[test]
    fn test_categories_capped_at_five() {
        let text = "tree person dog food computer car building painting sport room";
        assert_eq!(extract_categories(text).len(), 5);
    }

    #[test]
    fn test_caption_truncated_with_ellipsis() {
        let long = "word ".repeat(40);
        let caption = extract_caption(&long).unwrap();
        assert!(caption.ends_with("..."));
        assert!(caption.chars().count() <= AI_CAPTION_MAX_LEN + 3);
    }

    #[test]
    fn test_caption_none_for_short_sentences() {
        assert!(extract_caption("Hi. Ok. Yes.").is_none());
    }
}
