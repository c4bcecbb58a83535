use mindmap_core::DateRange;

pub const RECAP_SYSTEM_PROMPT: &str = r#"You write weekly recaps for a private journaling app.

Rules:
1. Address the journal writer directly in strict second person ("you", "your").
2. Never refer to yourself. No "I", "me", "my", "we", or "as an AI".
3. Ground every statement in the provided entry summaries; do not invent events.
4. Keep a warm, grounded tone. No clinical language, no advice-column cliches.
5. Respond with a single JSON object and nothing else. No commentary before or after.

The JSON object must have exactly these keys:
{
  "summary": "2-3 sentence synthesis of the week",
  "mood": "comma-separated mood words",
  "How You Have Been Feeling": "...",
  "What Might Be Contributing": "...",
  "Moments That Stood Out": "...",
  "What Helped You Cope": "...",
  "Remember": "one sentence worth keeping"
}"#;

/// The single user turn: the window plus the merged entry summaries,
/// most recent first.
pub fn recap_user_prompt(summaries: &str, range: DateRange) -> String {
    format!(
        "Journal entry summaries for the week of {} to {}:\n\n{}",
        range.start, range.end, summaries
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn user_prompt_names_the_window() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 8).unwrap(),
        };
        let prompt = recap_user_prompt("- slept well\n- long walk", range);
        assert!(prompt.contains("2024-06-02"));
        assert!(prompt.contains("2024-06-08"));
        assert!(prompt.contains("long walk"));
    }
}
