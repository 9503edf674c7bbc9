/// Anthropic Messages API backend.
pub mod claude;
/// OpenAI-compatible chat completions backend.
pub mod openai;

use async_trait::async_trait;
use mmrag_core::MmragResult;

/// Trait for LLM provider backends.
///
/// Each provider family implements single-turn completion: a system prompt
/// plus one user prompt in, the assistant's text out.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Assistant text for one system prompt and one user prompt.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> MmragResult<String>;
}
