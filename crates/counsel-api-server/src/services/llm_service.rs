use crate::config::LlmConfig;
use crate::models::chat::ChatMessage;
use crate::services::orchestrator::LlmProvider;
use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (OpenAI, OpenRouter).
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Result<Self> {
        // The orchestrator races its own timeout; this is only a backstop.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds.saturating_mul(2).max(1)))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Single non-streaming completion against `model`.
    pub async fn chat_completion(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        debug!("Calling {} with {} messages", model, messages.len());

        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.config.api_key.trim().is_empty() {
            builder = builder.bearer_auth(self.config.api_key.trim());
        }
        if !self.config.app_url.trim().is_empty() {
            builder = builder.header("HTTP-Referer", self.config.app_url.trim());
        }
        if !self.config.app_name.trim().is_empty() {
            builder = builder.header("X-Title", self.config.app_name.trim());
        }

        let response = builder
            .send()
            .await
            .context("Failed to call LLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error: {} - {}", status, truncate(&body, 300));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        if let Some(err) = parsed.error {
            bail!("LLM provider error: {}", err.message);
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            bail!("LLM returned an empty completion");
        }

        Ok(content)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait::async_trait]
impl LlmProvider for LlmService {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        self.chat_completion(model, messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> LlmService {
        let config = LlmConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            api_key: "test-key".to_string(),
            app_url: "https://counsel.example".to_string(),
            ..LlmConfig::default()
        };
        LlmService::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_completion_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("HTTP-Referer", "https://counsel.example"))
            .and(body_partial_json(json!({ "model": "openai/gpt-4o-mini", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Take AP Biology.  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let reply = service
            .chat_completion("openai/gpt-4o-mini", &[ChatMessage::user("What should I take?")])
            .await
            .unwrap();
        assert_eq!(reply, "Take AP Biology.");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .chat_completion("m", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_error_payload_with_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "message": "model not found", "code": 404 }
            })))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .chat_completion("missing/model", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn test_empty_completion_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }]
            })))
            .mount(&server)
            .await;

        assert!(service_for(&server)
            .chat_completion("m", &[ChatMessage::user("hi")])
            .await
            .is_err());
    }
}
