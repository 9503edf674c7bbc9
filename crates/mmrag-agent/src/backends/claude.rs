use super::LlmBackend;
use crate::config::ModelConfig;
use async_trait::async_trait;
use mmrag_core::{MmragError, MmragResult};
use serde::Serialize;

/// Claude (Anthropic) API backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl ClaudeBackend {
    /// Backend with a fresh HTTP client.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> MmragResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url());
        let messages = [ClaudeMessage {
            role: "user",
            content: prompt,
        }];
        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system_prompt,
            "messages": messages,
        });

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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
                "Claude API error {status}: {resp_body}"
            )));
        }

        parse_claude_response(&resp_body)
    }
}

/// Concatenate the text blocks of a Messages API response.
pub fn parse_claude_response(body: &serde_json::Value) -> MmragResult<String> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| MmragError::Llm(format!("response has no content blocks: {body}")))?;

    Ok(blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}
