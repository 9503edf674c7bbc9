#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the query pipeline against a real document store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mmrag_agent::{
    Answer, AnswerSynthesizer, ContextItem, ExtractiveSynthesizer, LlmClient, LlmProvider,
    LlmSynthesizer, ModelConfig, QueryConfig, RagPipeline,
};
use mmrag_core::{ContentUnit, MmragError, MmragResult};
use mmrag_memory::{DocumentStore, LocalEmbedding, StoreConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Records the context it was handed.
#[derive(Default)]
struct Spy {
    seen: Mutex<Vec<Vec<ContextItem>>>,
}

#[async_trait]
impl AnswerSynthesizer for Spy {
    async fn generate_answer(&self, query: &str, context: &[ContextItem]) -> MmragResult<Answer> {
        self.seen.lock().unwrap().push(context.to_vec());
        Ok(Answer {
            answer: format!("answer to {query}"),
            model: "spy".into(),
        })
    }
}

struct Failing;

#[async_trait]
impl AnswerSynthesizer for Failing {
    async fn generate_answer(&self, _query: &str, _context: &[ContextItem]) -> MmragResult<Answer> {
        Err(MmragError::Llm("model unavailable".into()))
    }
}

async fn q1_store() -> Arc<DocumentStore> {
    let config = StoreConfig::default();
    let store = DocumentStore::new(config.clone(), Arc::new(LocalEmbedding::new(config.dimension)))
        .unwrap();
    store
        .add_documents(vec![
            ContentUnit::text("q1.pdf", "revenue grew 10%").on_page(1),
            ContentUnit::image("q1.pdf", "bar chart of revenue").on_page(2),
            ContentUnit::text("hr.docx", "hiring plan for engineering"),
        ])
        .await
        .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn sources_keep_store_ranking_and_feed_context() {
    let store = q1_store().await;
    let spy = Arc::new(Spy::default());
    let pipeline = RagPipeline::new(Arc::clone(&store), spy.clone(), QueryConfig::default());

    let response = pipeline.query("revenue growth").await.unwrap();
    let direct = store.search("revenue growth", 5).await.unwrap();

    assert_eq!(response.sources, direct, "pipeline must not re-sort");
    assert_eq!(response.model, "spy");
    assert_eq!(response.answer, "answer to revenue growth");

    let seen = spy.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let context = &seen[0];
    assert_eq!(context.len(), direct.len());
    for (item, result) in context.iter().zip(&direct) {
        assert_eq!(item.source, result.metadata.source);
        assert_eq!(item.page, result.metadata.page);
        assert_eq!(item.content, result.content);
    }
}

#[tokio::test]
async fn empty_store_still_asks_synthesizer() {
    let config = StoreConfig::default();
    let store = Arc::new(
        DocumentStore::new(config.clone(), Arc::new(LocalEmbedding::new(config.dimension)))
            .unwrap(),
    );
    let spy = Arc::new(Spy::default());
    let pipeline = RagPipeline::new(store, spy.clone(), QueryConfig::default());

    let response = pipeline.query("anything").await.unwrap();
    assert!(response.sources.is_empty());
    assert_eq!(spy.seen.lock().unwrap()[0].len(), 0);
}

#[tokio::test]
async fn top_k_override_limits_sources() {
    let pipeline = RagPipeline::new(
        q1_store().await,
        Arc::new(ExtractiveSynthesizer::new()),
        QueryConfig::default(),
    );
    let response = pipeline.query_top_k("revenue", 1).await.unwrap();
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.model, "extractive");
}

#[tokio::test]
async fn invalid_queries_are_client_errors() {
    let pipeline = RagPipeline::new(
        q1_store().await,
        Arc::new(ExtractiveSynthesizer::new()),
        QueryConfig::default(),
    );
    let err = pipeline.query("   ").await.unwrap_err();
    assert!(err.is_client_error());
    let err = pipeline.query_top_k("revenue", 0).await.unwrap_err();
    assert!(matches!(err, MmragError::InvalidQuery(_)));
}

#[tokio::test]
async fn synthesizer_failure_propagates() {
    let pipeline = RagPipeline::new(q1_store().await, Arc::new(Failing), QueryConfig::default());
    let err = pipeline.query("revenue").await.unwrap_err();
    assert!(matches!(err, MmragError::Llm(_)));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn llm_synthesizer_end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
            let answer = if prompt.contains("Source: q1.pdf") {
                "Revenue grew 10% (q1.pdf)."
            } else {
                "I cannot answer."
            };
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": answer}}]}))
        })
        .expect(1)
        .mount(&server)
        .await;

    let model = ModelConfig {
        provider: LlmProvider::OpenAi,
        model_id: "gpt-4o-mini".into(),
        api_key: "sk-test".into(),
        api_base_url: Some(server.uri()),
        temperature: 0.7,
        max_tokens: 256,
    };
    let synth = LlmSynthesizer::new(LlmClient::new(model), "gpt-4o-mini");
    let pipeline = RagPipeline::new(q1_store().await, Arc::new(synth), QueryConfig::default());

    let response = pipeline.query("revenue growth").await.unwrap();
    assert_eq!(response.answer, "Revenue grew 10% (q1.pdf).");
    assert_eq!(response.model, "gpt-4o-mini");
    assert!(response.sources.iter().any(|s| s.metadata.source == "q1.pdf"));
}
