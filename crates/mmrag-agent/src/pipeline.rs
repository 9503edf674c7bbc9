use crate::context::assemble_context;
use crate::synthesizer::AnswerSynthesizer;
use mmrag_core::{MmragError, MmragResult, SearchResult};
use mmrag_memory::DocumentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Results retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Deadline for encoding the query, in seconds. 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_top_k() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl QueryConfig {
    /// Reject a zero `top_k`.
    pub fn validate(&self) -> MmragResult<()> {
        if self.top_k == 0 {
            return Err(MmragError::Config("query.top_k must be greater than 0".into()));
        }
        Ok(())
    }

    /// Encoding deadline, or `None` when `timeout_secs` is 0.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Answer plus the search results it was grounded on, in ranking order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Synthesized answer text.
    pub answer: String,
    /// Model that produced the answer.
    pub model: String,
    /// Results the answer was grounded on.
    pub sources: Vec<SearchResult>,
}

/// Retrieve, assemble context, delegate to the synthesizer.
///
/// No retries happen here; a synthesizer failure is returned as-is.
pub struct RagPipeline {
    store: Arc<DocumentStore>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    config: QueryConfig,
}

impl RagPipeline {
    /// Pipeline over `store` answering with `synthesizer`.
    pub fn new(
        store: Arc<DocumentStore>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        config: QueryConfig,
    ) -> Self {
        Self {
            store,
            synthesizer,
            config,
        }
    }

    /// Store queries are run against.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Query with the configured `top_k`.
    pub async fn query(&self, query: &str) -> MmragResult<QueryResponse> {
        self.query_top_k(query, self.config.top_k).await
    }

    /// Query with a per-request result count.
    pub async fn query_top_k(&self, query: &str, top_k: usize) -> MmragResult<QueryResponse> {
        let sources = match self.config.timeout() {
            Some(timeout) => self.store.search_with_timeout(query, top_k, timeout).await?,
            None => self.store.search(query, top_k).await?,
        };
        if sources.is_empty() {
            info!(top_k, "No relevant context found");
        }

        let context = assemble_context(&sources);
        let answer = self.synthesizer.generate_answer(query, &context).await?;
        info!(model = %answer.model, sources = sources.len(), "Answered query");

        Ok(QueryResponse {
            answer: answer.answer,
            model: answer.model,
            sources,
        })
    }
}
