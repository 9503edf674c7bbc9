use super::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use mmrag_core::{MmragError, MmragResult};

/// OpenAI-compatible API backend.
///
/// Works with OpenAI, OpenRouter, Groq, Ollama, and any other provider
/// that implements the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    /// Backend with a fresh HTTP client.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter requires extra headers
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "mmrag")
        } else {
            request
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> MmragResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": prompt },
            ],
        });

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| MmragError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MmragError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(MmragError::Llm(format!(
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        parse_openai_response(&resp_body)
    }
}

/// Extract the assistant text from a chat completions response.
pub fn parse_openai_response(body: &serde_json::Value) -> MmragResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MmragError::Llm(format!("response has no message content: {body}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: LlmProvider, base: &str) -> ModelConfig {
        ModelConfig {
            provider,
            model_id: "gpt-4o-mini".into(),
            api_key: "sk-test".into(),
            api_base_url: Some(base.to_string()),
            temperature: 0.2,
            max_tokens: 128,
        }
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Revenue grew."}, "finish_reason": "stop"}]
        });
        assert_eq!(parse_openai_response(&body).unwrap(), "Revenue grew.");
    }

    #[test]
    fn test_parse_response_without_content() {
        let body = json!({"choices": []});
        assert!(matches!(parse_openai_response(&body), Err(MmragError::Llm(_))));
    }

    #[tokio::test]
    async fn test_complete_sends_prompts_and_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 128,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "question"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "answer"}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(config(LlmProvider::OpenAi, &server.uri()));
        assert_eq!(backend.complete("sys", "question").await.unwrap(), "answer");
    }

    #[tokio::test]
    async fn test_openrouter_title_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Title", "mmrag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(config(LlmProvider::OpenRouter, &server.uri()));
        assert_eq!(backend.complete("s", "p").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_api_error_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "rate limited"}})),
            )
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(config(LlmProvider::Groq, &server.uri()));
        let err = backend.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, MmragError::Llm(ref m) if m.contains("429")));
    }
}
