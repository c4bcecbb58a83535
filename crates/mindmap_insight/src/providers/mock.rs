//! Mock LLM provider — deterministic responses for tests and offline runs.

use crate::llm::{CompletionParams, LlmClient};
use mindmap_core::{InsightError, Result};

#[derive(Debug, Clone)]
pub struct MockLlm {
    response: Option<String>,
}

impl MockLlm {
    /// Always answer with the given text.
    pub fn new(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
        }
    }

    /// Always fail, as an unreachable upstream would.
    pub fn failing() -> Self {
        Self { response: None }
    }

    /// A well-formed recap answer, code-fenced the way models like to.
    pub fn canned_recap() -> Self {
        Self::new(
            r#"```json
{
  "summary": "You spent the week noticing small moments and writing them down.",
  "mood": ["calm", "reflective"],
  "How You Have Been Feeling": "You have been feeling steady, with a quiet undercurrent of optimism.",
  "What Might Be Contributing": "Regular evenings of journaling and time outdoors seem to be helping.",
  "Moments That Stood Out": "A long walk midweek kept coming back in your entries.",
  "What Helped You Cope": "You leaned on routine and short breaks when the days got busy.",
  "Remember": "Small consistent habits carried you through this week."
}
```"#,
        )
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _params: CompletionParams,
    ) -> Result<String> {
        match &self.response {
            Some(text) => Ok(text.clone()),
            None => Err(InsightError::Llm("mock provider set to fail".to_string())),
        }
    }
}
