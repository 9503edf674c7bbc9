//! Answer synthesis for mmrag.
//!
//! Retrieved search results are rendered into labelled context blocks and
//! handed to an [`AnswerSynthesizer`]: either an LLM backend (OpenAI-compatible
//! or Claude) or the offline [`ExtractiveSynthesizer`]. [`RagPipeline`] ties
//! retrieval, context assembly and synthesis together.

/// LLM provider backends.
pub mod backends;
/// Model provider settings.
pub mod config;
/// Context assembly from search results.
pub mod context;
/// Provider-dispatching LLM client.
pub mod llm;
/// Retrieval plus synthesis.
pub mod pipeline;
/// Answer synthesizers and the prompt template.
pub mod synthesizer;

pub use config::{resolve_secret, LlmProvider, ModelConfig};
pub use context::{assemble_context, render_context, ContextItem};
pub use llm::LlmClient;
pub use pipeline::{QueryConfig, QueryResponse, RagPipeline};
pub use synthesizer::{
    build_prompt, Answer, AnswerSynthesizer, ExtractiveSynthesizer, LlmSynthesizer,
    EXTRACTIVE_MODEL,
};
