use mmrag_core::{MmragError, MmragResult};
use serde::{Deserialize, Serialize};

/// Supported answer model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Claude,
    /// OpenAI chat completions.
    OpenAi,
    /// OpenRouter, OpenAI-compatible API.
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
}

/// Answer model settings, read from the `[model]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which API to call.
    pub provider: LlmProvider,
    /// Model name sent with each request.
    pub model_id: String,
    /// Literal key, or `env:VAR_NAME` to read it from the environment.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's default endpoint.
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl ModelConfig {
    /// Endpoint root without a trailing slash.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::Claude => "https://api.anthropic.com",
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
            }
        }
    }

    /// Copy of this config with `env:` references in `api_key` resolved.
    pub fn resolved(&self) -> MmragResult<Self> {
        if self.model_id.trim().is_empty() {
            return Err(MmragError::Config("model.model_id must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(MmragError::Config(format!(
                "model.temperature must be within 0..=2, got {}",
                self.temperature
            )));
        }
        Ok(Self {
            api_key: resolve_secret(&self.api_key)?,
            ..self.clone()
        })
    }
}

/// Resolve a secret that may be written as `env:VAR_NAME`.
pub fn resolve_secret(value: &str) -> MmragResult<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var.trim()).map_err(|_| {
            MmragError::Config(format!("environment variable '{}' is not set", var.trim()))
        }),
        None => Ok(value.to_string()),
    }
}
