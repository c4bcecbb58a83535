//! Recovery of the recap JSON from whatever the model actually returned.
//!
//! Models wrap JSON in Markdown fences or pad it with prose often enough
//! that a bare `serde_json::from_str` is not good enough. Recovery is an
//! ordered list of parser strategies tried in sequence, short-circuiting on
//! the first success; if all fail, the error carries both the raw and the
//! cleaned text so the caller can see what the model said.

use mindmap_core::{InsightError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The fixed-shape object the recap prompt demands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecapAnalysis {
    pub summary: String,
    /// Accepts either a string or a list of mood words; lists are joined
    /// with `", "`.
    #[serde(deserialize_with = "mood_words")]
    pub mood: String,
    #[serde(rename = "How You Have Been Feeling", default)]
    pub feeling: String,
    #[serde(rename = "What Might Be Contributing", default)]
    pub contributing: String,
    #[serde(rename = "Moments That Stood Out", default)]
    pub moments: String,
    #[serde(rename = "What Helped You Cope", default)]
    pub cope: String,
    #[serde(rename = "Remember", default)]
    pub remember: String,
}

fn mood_words<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", ")),
        other => Err(serde::de::Error::custom(format!(
            "mood must be a string or a list of strings, got {other}"
        ))),
    }
}

/// Parse the model's answer, trying each recovery strategy in order:
/// direct parse, code-fence strip, brace extraction.
pub fn parse_recap_analysis(raw: &str) -> Result<RecapAnalysis> {
    let trimmed = raw.trim();

    let mut candidates: Vec<String> = vec![trimmed.to_string()];
    if let Some(unfenced) = strip_code_fence(trimmed) {
        candidates.push(unfenced);
    }
    if let Some(braced) = extract_braces(trimmed) {
        candidates.push(braced.to_string());
    }

    let mut last_error = None;
    for candidate in &candidates {
        match serde_json::from_str::<RecapAnalysis>(candidate) {
            Ok(analysis) => return Ok(analysis),
            Err(e) => last_error = Some(e),
        }
    }

    let cleaned = candidates.pop().unwrap_or_default();
    Err(InsightError::LlmParse {
        detail: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "empty response".to_string()),
        raw: raw.to_string(),
        cleaned,
    })
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
pub(crate) fn strip_code_fence(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```")?;
    Some(rest.trim().to_string())
}

/// The slice between the first `{` and the last `}`, if any.
fn extract_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
