use crate::llm::{CompletionParams, LlmClient};
use mindmap_core::{config::LlmConfig, InsightError, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| InsightError::Llm("OPENAI_API_KEY is not set".to_string()))?;
        let base_url = cfg
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .map_err(|e| InsightError::Llm(format!("failed to build http client: {e}")))?,
            api_key,
            base_url,
            model: cfg.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| InsightError::Llm(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(InsightError::Llm(format!(
                "upstream returned {status}: {error_text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| InsightError::Llm(format!("response body was not JSON: {e}")))?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| InsightError::Llm("completion contained no text content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            provider: "openai".into(),
            model: "test-model".into(),
            base_url: Some(base_url.to_string()),
            max_tokens: 256,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn extracts_text_from_chat_completion() {
        std::env::set_var("OPENAI_API_KEY", "test-key");
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello there"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server.uri())).unwrap();
        let text = client
            .complete("system", "user", CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn non_ok_status_is_an_llm_error() {
        std::env::set_var("OPENAI_API_KEY", "test-key");
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server.uri())).unwrap();
        let err = client
            .complete("system", "user", CompletionParams::default())
            .await
            .unwrap_err();
        match err {
            InsightError::Llm(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("slow down"));
            }
            other => panic!("expected Llm error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_text_content_is_an_llm_error() {
        std::env::set_var("OPENAI_API_KEY", "test-key");
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            client
                .complete("system", "user", CompletionParams::default())
                .await,
            Err(InsightError::Llm(_))
        ));
    }
}
