use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalKind {
    Freeform,
    Guided,
}

impl JournalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalKind::Freeform => "freeform",
            JournalKind::Guided => "guided",
        }
    }
}

/// Transient recap input: one journal entry's summary plus enough metadata
/// to sort by recency. Gathered from both journal tables, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSummaryEntry {
    pub journal_id: Uuid,
    pub journal_summary: String,
    pub date_created: NaiveDate,
    pub time_created: NaiveTime,
    pub journal_type: JournalKind,
}

/// Content fields that count toward an entry's word total.
const TEXT_FIELDS: [&str; 4] = ["answer", "text", "content", "response"];

/// Total word count of a journal entry's structured content.
///
/// Content is either a single object or a list of objects; in both shapes
/// the recognized text fields are summed. Anything else counts as zero.
pub fn content_word_count(content: &Value) -> u32 {
    match content {
        Value::Object(obj) => object_word_count(obj),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(object_word_count)
            .sum(),
        _ => 0,
    }
}

fn object_word_count(obj: &serde_json::Map<String, Value>) -> u32 {
    TEXT_FIELDS
        .iter()
        .filter_map(|field| obj.get(*field))
        .filter_map(Value::as_str)
        .map(|text| text.split_whitespace().count() as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_words_in_single_object() {
        let content = json!({"answer": "one two three", "mood": "ignored words here"});
        assert_eq!(content_word_count(&content), 3);
    }

    #[test]
    fn sums_recognized_fields_within_one_object() {
        let content = json!({"text": "a b", "response": "c d e"});
        assert_eq!(content_word_count(&content), 5);
    }

    #[test]
    fn counts_words_across_list_of_objects() {
        let content = json!([
            {"answer": "one two"},
            {"content": "three four five"},
            {"unrelated": "six"}
        ]);
        assert_eq!(content_word_count(&content), 5);
    }

    #[test]
    fn non_object_shapes_count_zero() {
        assert_eq!(content_word_count(&json!("bare string")), 0);
        assert_eq!(content_word_count(&json!(42)), 0);
        assert_eq!(content_word_count(&json!(null)), 0);
    }

    #[test]
    fn whitespace_only_text_counts_zero() {
        assert_eq!(content_word_count(&json!({"answer": "   "})), 0);
    }
}
