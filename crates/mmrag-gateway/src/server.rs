use crate::error::ApiError;
use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::{get, post},
    Form, Json, Router,
};
use mmrag_agent::{QueryResponse, RagPipeline};
use mmrag_core::MetadataRecord;
use mmrag_ingest::{IngestReport, Ingestor};
use mmrag_memory::DocumentStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared application state.
pub struct AppState {
    /// Shared document store.
    pub store: Arc<DocumentStore>,
    /// Handles `POST /upload`.
    pub ingestor: Arc<Ingestor>,
    /// Handles `POST /query`.
    pub pipeline: Arc<RagPipeline>,
    /// Where the store is snapshotted after each successful upload.
    pub snapshot_dir: Option<PathBuf>,
}

/// Body of `POST /query`, as a form or as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Question text; must not be blank.
    pub query: String,
    /// Overrides the configured result count.
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    result: IngestReport,
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<MetadataRecord>,
}

/// The HTTP front end.
pub struct GatewayServer;

impl GatewayServer {
    /// Router with every route, the body limit and shared state.
    pub fn build(state: Arc<AppState>, config: &ServerConfig) -> Router {
        Router::new()
            .route("/upload", post(upload_handler))
            .route("/query", post(query_handler))
            .route("/sources", get(sources_handler))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(config.max_upload_bytes))
            .with_state(state)
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mmrag",
        "documents": state.store.len().await,
    }))
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("field 'file' has no file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("missing multipart field 'file'"))?;

    info!(filename = %filename, size = bytes.len(), "Upload received");
    let report = state.ingestor.ingest_upload(&filename, &bytes).await?;

    // The units are already committed; a failed snapshot does not undo them.
    if let Some(dir) = &state.snapshot_dir {
        if let Err(e) = state.store.save(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to snapshot document store");
        }
    }

    Ok(Json(UploadResponse {
        message: "File processed successfully",
        result: report,
    }))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<QueryResponse>, ApiError> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let body = if is_json {
        let Json(body) = Json::<QueryRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        body
    } else {
        let Form(body) = Form::<QueryRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        body
    };

    let response = match body.top_k {
        Some(top_k) => state.pipeline.query_top_k(&body.query, top_k).await?,
        None => state.pipeline.query(&body.query).await?,
    };
    Ok(Json(response))
}

async fn sources_handler(State(state): State<Arc<AppState>>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: state.store.list().await,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use mmrag_agent::{ExtractiveSynthesizer, QueryConfig};
    use mmrag_core::ContentUnit;
    use mmrag_ingest::{ExtractorRegistry, IngestConfig};
    use mmrag_memory::{LocalEmbedding, StoreConfig};
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = StoreConfig::default();
        let store = Arc::new(
            DocumentStore::new(config.clone(), Arc::new(LocalEmbedding::new(config.dimension)))
                .unwrap(),
        );
        store
            .add_documents(vec![ContentUnit::text("a.txt", "revenue grew 10%")])
            .await
            .unwrap();
        let ingestor = Arc::new(Ingestor::new(
            IngestConfig::default(),
            ExtractorRegistry::with_builtins(),
            Arc::clone(&store),
        ));
        let pipeline = Arc::new(RagPipeline::new(
            Arc::clone(&store),
            Arc::new(ExtractiveSynthesizer::new()),
            QueryConfig::default(),
        ));
        let state = Arc::new(AppState {
            store,
            ingestor,
            pipeline,
            snapshot_dir: None,
        });
        GatewayServer::build(state, &ServerConfig::default())
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_accepts_form() {
        let resp = app()
            .await
            .oneshot(
                HttpRequest::post("/query")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("query=revenue&top_k=1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["model"], "extractive");
        assert_eq!(body["sources"].as_array().unwrap().len(), 1);
        assert_eq!(body["sources"][0]["metadata"]["source"], "a.txt");
    }

    #[tokio::test]
    async fn test_query_accepts_json() {
        let resp = app()
            .await
            .oneshot(
                HttpRequest::post("/query")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"query": "revenue"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(json_body(resp).await["answer"].is_string());
    }

    #[tokio::test]
    async fn test_blank_query_is_400() {
        let resp = app()
            .await
            .oneshot(
                HttpRequest::post("/query")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"query": "  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_query_without_field_is_rejected() {
        let resp = app()
            .await
            .oneshot(
                HttpRequest::post("/query")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("q=revenue"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_sources_lists_metadata() {
        let resp = app()
            .await
            .oneshot(HttpRequest::get("/sources").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(
            body,
            serde_json::json!({"sources": [{"source": "a.txt", "type": "text", "page": 0}]})
        );
    }

    #[test]
    fn test_server_config_defaults() {
        let config: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }
}
