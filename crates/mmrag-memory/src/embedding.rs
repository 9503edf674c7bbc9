use async_trait::async_trait;
use mmrag_core::{MmragError, MmragResult};
use std::collections::HashMap;

/// Trait for computing text embeddings (vector representations).
///
/// Implementations must be deterministic for a fixed model version: the same
/// input text always yields the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute embedding vector for a single text.
    async fn embed(&self, text: &str) -> MmragResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| MmragError::Encoding("encoder returned no vector".to_string()))
    }

    /// Compute embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> MmragResult<Vec<Vec<f32>>>;

    /// Dimension of the embedding vectors produced by this provider.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

/// Local bag-of-words embedding (no external model needed).
///
/// Hashes each token to a few dimensions weighted by term frequency, then
/// L2-normalizes. Inference runs on the blocking thread pool.
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    /// Model identifier reported by [`EmbeddingProvider::model_name`].
    pub const MODEL_NAME: &'static str = "local-hash";

    /// Provider producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed_batch(&self, texts: &[&str]) -> MmragResult<Vec<Vec<f32>>> {
        if self.dimension == 0 {
            return Err(MmragError::Encoding(
                "embedding dimension must be positive".to_string(),
            ));
        }
        let owned: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
        let dimension = self.dimension;

        tokio::task::spawn_blocking(move || {
            owned
                .iter()
                .map(|text| hash_embed(text, dimension))
                .collect::<MmragResult<Vec<_>>>()
        })
        .await
        .map_err(|e| MmragError::Encoding(format!("embedding task failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }
}

fn hash_embed(text: &str, dimension: usize) -> MmragResult<Vec<f32>> {
    if text.trim().is_empty() {
        return Err(MmragError::Encoding("Cannot embed empty text".to_string()));
    }

    let mut vector = vec![0.0f32; dimension];

    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .collect();

    let mut freq: HashMap<&str, f32> = HashMap::new();
    for word in &words {
        *freq.entry(word).or_insert(0.0) += 1.0;
    }

    let total = words.len() as f32;
    if total == 0.0 {
        return Ok(vector);
    }

    // Three hash positions per word spread collisions out
    for (word, count) in &freq {
        let tf = count / total;
        let hash1 = fnv1a(word.as_bytes()) as usize;
        let hash2 = fnv1a(&[word.as_bytes(), &[1u8]].concat()) as usize;
        let hash3 = fnv1a(&[word.as_bytes(), &[2u8]].concat()) as usize;

        vector[hash1 % dimension] += tf;
        vector[hash2 % dimension] += tf * 0.7;
        vector[hash3 % dimension] += tf * 0.5;
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }

    Ok(vector)
}

/// FNV-1a, 32-bit.
fn fnv1a(data: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(feature = "http-embeddings")]
pub use http::{HttpEmbedding, HttpEmbeddingConfig};

#[cfg(feature = "http-embeddings")]
mod http {
    use super::EmbeddingProvider;
    use async_trait::async_trait;
    use mmrag_core::{MmragError, MmragResult};
    use serde::Deserialize;

    /// Settings for an OpenAI-compatible `/v1/embeddings` endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpEmbeddingConfig {
        /// API root, without the `/v1/embeddings` suffix.
        pub base_url: String,
        /// Embedding model name.
        pub model: String,
        /// Sent as a bearer token.
        pub api_key: String,
        /// Expected vector dimension; responses are checked against it.
        pub dimension: usize,
        /// Texts per request.
        pub batch_size: usize,
    }

    /// Embedding provider backed by a remote OpenAI-compatible API.
    pub struct HttpEmbedding {
        config: HttpEmbeddingConfig,
        http: reqwest::Client,
    }

    impl HttpEmbedding {
        /// Provider with a fresh HTTP client.
        pub fn new(config: HttpEmbeddingConfig) -> Self {
            Self {
                config,
                http: reqwest::Client::new(),
            }
        }

        async fn embed_chunk(&self, inputs: &[&str]) -> MmragResult<Vec<Vec<f32>>> {
            let url = format!(
                "{}/v1/embeddings",
                self.config.base_url.trim_end_matches('/')
            );
            let body = serde_json::json!({
                "model": self.config.model,
                "input": inputs,
            });

            let resp = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .json(&body)
                .send()
                .await
                .map_err(|e| MmragError::Encoding(format!("embedding request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(MmragError::Encoding(format!(
                    "embedding API error {status}: {text}"
                )));
            }

            let mut parsed: EmbeddingResponse = resp
                .json()
                .await
                .map_err(|e| MmragError::Encoding(format!("invalid embedding response: {e}")))?;

            if parsed.data.len() != inputs.len() {
                return Err(MmragError::Encoding(format!(
                    "embedding API returned {} vectors for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                )));
            }
            parsed.data.sort_by_key(|d| d.index);
            Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
        }
    }

    #[derive(Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Deserialize)]
    struct EmbeddingData {
        index: usize,
        embedding: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for HttpEmbedding {
        async fn embed_batch(&self, texts: &[&str]) -> MmragResult<Vec<Vec<f32>>> {
            let mut vectors = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(self.config.batch_size.max(1)) {
                vectors.extend(self.embed_chunk(chunk).await?);
            }
            Ok(vectors)
        }

        fn dimension(&self) -> usize {
            self.config.dimension
        }

        fn model_name(&self) -> &str {
            &self.config.model
        }
    }

}
