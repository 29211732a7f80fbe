//! Category and tag normalization.
//!
//! Labels are free text. Before they are stored or compared they are trimmed,
//! inner whitespace is collapsed to single spaces, they are lowercased and cut
//! to [`LABEL_MAX_LEN`](crate::defaults::LABEL_MAX_LEN) characters. Empty labels
//! are dropped and duplicates keep their first position.

use std::collections::HashSet;

use crate::defaults::{LABEL_FILTER_ALL, LABEL_MAX_LEN};

/// Normalize a single label. Returns `None` for blank input.
pub fn normalize_label(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    let lowered = collapsed.to_lowercase();
    let truncated: String = lowered.chars().take(LABEL_MAX_LEN).collect();
    // Truncation can leave a trailing space behind.
    let truncated = truncated.trim_end();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated.to_string())
    }
}

/// Normalize a list of labels, dropping blanks and duplicates.
pub fn normalize_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        if let Some(normalized) = normalize_label(label.as_ref()) {
            if seen.insert(normalized.clone()) {
                out.push(normalized);
            }
        }
    }
    out
}

/// Parse label input from a form field.
///
/// Accepts either a JSON array of strings (`["a","b"]`) or a comma-separated
/// list (`a, b`). The result is normalized.
pub fn parse_label_input(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(values) = serde_json::from_str::<Vec<String>>(trimmed) {
            return normalize_labels(values);
        }
    }
    normalize_labels(trimmed.split(','))
}

/// Interpret a category/tag filter value.
///
/// Returns `None` when the filter is disabled (absent, blank or `All` in any
/// case), otherwise the normalized label to match exactly.
pub fn label_filter(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.trim().eq_ignore_ascii_case(LABEL_FILTER_ALL) {
        return None;
    }
    normalize_label(raw)
}

/// Union of two normalized label lists, `primary` first.
pub fn merge_labels(primary: &[String], extra: &[String]) -> Vec<String> {
    normalize_labels(primary.iter().chain(extra.iter()))
}
