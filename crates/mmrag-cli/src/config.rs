use mmrag_agent::{resolve_secret, ModelConfig, QueryConfig};
use mmrag_core::{MmragError, MmragResult};
use mmrag_gateway::ServerConfig;
use mmrag_ingest::IngestConfig;
use mmrag_memory::StoreConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mmrag.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct MmragConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub vector_store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
    /// Answer model; without it answers are extractive.
    #[serde(default)]
    pub model: Option<ModelConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Hashed bag-of-words, no external model.
    #[default]
    Local,
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingBackend,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::default(),
            model: String::new(),
            api_key: String::new(),
            base_url: String::new(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_batch_size() -> usize {
    32
}

impl Default for MmragConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            vector_store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            ingest: IngestConfig::default(),
            query: QueryConfig::default(),
            model: None,
            server: ServerConfig::default(),
        }
    }
}

impl MmragConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(source: &str) -> MmragResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| MmragError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or the default file if present, or built-in defaults.
    pub async fn load(path: Option<&Path>) -> MmragResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !tokio::fs::try_exists(&default).await.unwrap_or(false) {
                    let config = Self::default();
                    config.validate()?;
                    return Ok(config);
                }
                default
            }
        };
        let source = tokio::fs::read_to_string(&path).await.map_err(|e| {
            MmragError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_toml(&source)
    }

    pub fn validate(&self) -> MmragResult<()> {
        self.vector_store.validate()?;
        self.query.validate()?;
        if self.ingest.supported_formats.is_empty() {
            return Err(MmragError::Config(
                "ingest.supported_formats must not be empty".into(),
            ));
        }
        if self.ingest.image_batch_size == 0 {
            return Err(MmragError::Config(
                "ingest.image_batch_size must be greater than 0".into(),
            ));
        }
        if self.embedding.provider == EmbeddingBackend::Http {
            if self.embedding.base_url.trim().is_empty() || self.embedding.model.trim().is_empty() {
                return Err(MmragError::Config(
                    "embedding.base_url and embedding.model are required for the http provider"
                        .into(),
                ));
            }
            if self.embedding.batch_size == 0 {
                return Err(MmragError::Config(
                    "embedding.batch_size must be greater than 0".into(),
                ));
            }
        }
        Ok(())
    }

    /// Snapshot directory of the document store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// Embedding API key with `env:` references resolved.
    pub fn embedding_api_key(&self) -> MmragResult<String> {
        resolve_secret(&self.embedding.api_key)
    }
}
