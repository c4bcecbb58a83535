use async_trait::async_trait;
use mindmap_core::{config::LlmConfig, InsightError, Result};
use std::sync::Arc;

/// Parameters for one LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl CompletionParams {
    pub fn from_config(cfg: &LlmConfig) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }
}

/// The text-completion seam: prompt in, free text out.
///
/// The recap pipeline makes exactly one call per analysis; there is no
/// retry or backoff at this seam.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str, params: CompletionParams)
        -> Result<String>;
}

/// Build the configured provider.
pub fn build_client(cfg: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(crate::providers::OpenAiClient::new(cfg)?)),
        "mock" => Ok(Arc::new(crate::providers::MockLlm::canned_recap())),
        other => Err(InsightError::Validation(format!(
            "unknown llm provider: {other}"
        ))),
    }
}
