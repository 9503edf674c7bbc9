use crate::context::{render_context, ContextItem};
use crate::llm::LlmClient;
use async_trait::async_trait;
use mmrag_core::MmragResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model identifier reported by [`ExtractiveSynthesizer`].
pub const EXTRACTIVE_MODEL: &str = "extractive";

const SYSTEM_PROMPT: &str =
    "You are a professional question-answering assistant. You answer questions using only the reference material you are given.";

/// Context blocks quoted by the extractive synthesizer.
const EXTRACTIVE_BLOCKS: usize = 3;

/// A synthesized answer and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text.
    pub answer: String,
    /// Model identifier, or `extractive` for the offline synthesizer.
    pub model: String,
}

/// Turns a question plus retrieved context into an answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// `context` is in retrieval order and may be empty.
    async fn generate_answer(&self, query: &str, context: &[ContextItem]) -> MmragResult<Answer>;
}

/// User prompt shared by every LLM backend.
pub fn build_prompt(query: &str, context: &[ContextItem]) -> String {
    let rendered = if context.is_empty() {
        "(no reference material was found)\n".to_string()
    } else {
        render_context(context)
    };
    format!(
        "Answer the question using the reference material below. \
         If the material is not sufficient to answer, say that you cannot answer.\n\n\
         Reference material:\n{rendered}\n\
         Question: {query}\n\n\
         Give a detailed, accurate answer and cite the sources you used."
    )
}

/// Answers through a chat-completion LLM.
pub struct LlmSynthesizer {
    client: LlmClient,
    model: String,
}

impl LlmSynthesizer {
    /// Synthesizer reporting `model` in its answers.
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmSynthesizer {
    async fn generate_answer(&self, query: &str, context: &[ContextItem]) -> MmragResult<Answer> {
        let prompt = build_prompt(query, context);
        debug!(model = %self.model, context = context.len(), "Requesting answer");
        let answer = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(Answer {
            answer,
            model: self.model.clone(),
        })
    }
}

/// Offline synthesizer: quotes the best-ranked context blocks verbatim.
#[derive(Debug, Default, Clone)]
pub struct ExtractiveSynthesizer;

impl ExtractiveSynthesizer {
    /// Stateless; same as [`Default::default`].
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnswerSynthesizer for ExtractiveSynthesizer {
    async fn generate_answer(&self, _query: &str, context: &[ContextItem]) -> MmragResult<Answer> {
        let answer = if context.is_empty() {
            "No relevant content was found for this question.".to_string()
        } else {
            let top = &context[..context.len().min(EXTRACTIVE_BLOCKS)];
            format!("Most relevant material:\n\n{}", render_context(top))
        };
        Ok(Answer {
            answer,
            model: EXTRACTIVE_MODEL.to_string(),
        })
    }
}
