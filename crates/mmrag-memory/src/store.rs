use crate::codec::{decode_index, encode_index};
use crate::embedding::EmbeddingProvider;
use crate::fusion::{fuse_batch, FusedUnit};
use crate::index::{FlatIndex, IvfIndex, Metric, VectorIndex};
use mmrag_core::{Content, ContentUnit, MetadataRecord, MmragError, MmragResult, SearchResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// File name of the index artifact inside a snapshot directory.
pub const INDEX_FILE: &str = "index.bin";
/// File name of the metadata artifact inside a snapshot directory.
pub const METADATA_FILE: &str = "metadata.jsonl";

/// Configuration of a [`DocumentStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Embedding dimension, fixed for the store's lifetime.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Distance metric used for search and scoring.
    #[serde(default)]
    pub metric: Metric,
    /// Number of inverted-file partitions; 0 keeps the exact index.
    #[serde(default)]
    pub partition_count: usize,
    /// Partitions scanned per query.
    #[serde(default = "default_probe_count")]
    pub probe_count: usize,
    /// Training starts once the store holds
    /// `partition_count * min_points_per_partition` vectors.
    #[serde(default = "default_min_points_per_partition")]
    pub min_points_per_partition: usize,
    /// k-means iterations used to train the partitions.
    #[serde(default = "default_training_iterations")]
    pub training_iterations: usize,
}

fn default_dimension() -> usize {
    256
}
fn default_probe_count() -> usize {
    1
}
fn default_min_points_per_partition() -> usize {
    39
}
fn default_training_iterations() -> usize {
    20
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            metric: Metric::default(),
            partition_count: 0,
            probe_count: default_probe_count(),
            min_points_per_partition: default_min_points_per_partition(),
            training_iterations: default_training_iterations(),
        }
    }
}

impl StoreConfig {
    /// Reject settings the index cannot honor.
    pub fn validate(&self) -> MmragResult<()> {
        if self.dimension == 0 {
            return Err(MmragError::Config("dimension must be positive".into()));
        }
        if self.partition_count > 0 {
            if self.probe_count == 0 || self.probe_count > self.partition_count {
                return Err(MmragError::Config(format!(
                    "probe_count must be in 1..={}, got {}",
                    self.partition_count, self.probe_count
                )));
            }
            if self.min_points_per_partition == 0 {
                return Err(MmragError::Config(
                    "min_points_per_partition must be positive".into(),
                ));
            }
        }
        Ok(())
    }

    /// Vector count at which the partitioned index gets trained, if enabled.
    pub fn training_threshold(&self) -> Option<usize> {
        (self.partition_count > 0)
            .then(|| self.partition_count.saturating_mul(self.min_points_per_partition))
    }
}

/// What is kept for every vector besides the vector itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(flatten)]
    metadata: MetadataRecord,
    #[serde(flatten)]
    content: Content,
}

/// Index and records as one unit.
///
/// Position `i` of `records` describes vector `i` of `index`. Only
/// [`StoreState::commit`] grows either side, and it grows both or neither.
struct StoreState {
    index: VectorIndex,
    records: Vec<StoredRecord>,
}

impl StoreState {
    fn empty(config: &StoreConfig) -> Self {
        Self {
            index: VectorIndex::Flat(FlatIndex::new(config.dimension, config.metric)),
            records: Vec::new(),
        }
    }

    fn check(&self) -> MmragResult<()> {
        if self.index.len() != self.records.len() {
            return Err(MmragError::InconsistentStore {
                index: self.index.len(),
                metadata: self.records.len(),
            });
        }
        Ok(())
    }

    fn commit(
        &mut self,
        config: &StoreConfig,
        vectors: Vec<Vec<f32>>,
        records: Vec<StoredRecord>,
    ) -> MmragResult<()> {
        if vectors.len() != records.len() {
            return Err(MmragError::Encoding(format!(
                "{} vectors for {} records",
                vectors.len(),
                records.len()
            )));
        }

        let new_len = self.index.len() + vectors.len();
        let migrate = match (&self.index, config.training_threshold()) {
            (VectorIndex::Flat(_), Some(threshold)) => new_len >= threshold,
            _ => false,
        };

        if migrate {
            // Build the partitioned index off to the side; on failure the
            // current pair stays untouched.
            let mut all: Vec<Vec<f32>> = match &self.index {
                VectorIndex::Flat(flat) => flat.vectors().map(<[f32]>::to_vec).collect(),
                VectorIndex::Partitioned(_) => Vec::new(),
            };
            all.extend(vectors);
            let mut ivf = IvfIndex::new(
                config.dimension,
                config.metric,
                config.partition_count,
                config.probe_count,
                config.training_iterations,
            );
            ivf.train(&all)?;
            ivf.add(&all)?;
            info!(
                vectors = all.len(),
                partitions = config.partition_count,
                "Trained partitioned index"
            );
            self.index = VectorIndex::Partitioned(ivf);
        } else {
            self.index.add(&vectors)?;
        }

        self.records.extend(records);
        self.check()
    }
}

/// Multimodal document store: encoder, vector index and metadata as one unit.
///
/// Ingestion is serialized behind a writer lock; searches share a reader
/// lock. The lock is fair, so a queued `add_documents` blocks searches that
/// arrive after it. Encoding runs before any lock is taken. Snapshots are
/// written one at a time.
pub struct DocumentStore {
    config: StoreConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    state: RwLock<StoreState>,
    snapshot: Mutex<()>,
}

impl DocumentStore {
    /// Create an empty store. Fails if the encoder dimension disagrees with
    /// the configured one.
    pub fn new(config: StoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> MmragResult<Self> {
        config.validate()?;
        if embedder.dimension() != config.dimension {
            return Err(MmragError::Config(format!(
                "encoder '{}' produces {}-d vectors but the store is configured for {}",
                embedder.model_name(),
                embedder.dimension(),
                config.dimension
            )));
        }
        let state = RwLock::new(StoreState::empty(&config));
        Ok(Self {
            config,
            embedder,
            state,
            snapshot: Mutex::new(()),
        })
    }

    /// Create a store and restore the snapshot in `dir` if one exists.
    pub async fn open(
        config: StoreConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        dir: &Path,
    ) -> MmragResult<Self> {
        let store = Self::new(config, embedder)?;
        if snapshot_exists(dir).await {
            store.load(dir).await?;
        }
        Ok(store)
    }

    /// Settings the store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fuse, encode and append a batch of content units.
    ///
    /// All-or-nothing: an empty unit or an encoder failure leaves the store
    /// exactly as it was.
    pub async fn add_documents(&self, units: Vec<ContentUnit>) -> MmragResult<()> {
        self.add_documents_inner(units, None).await
    }

    /// Like [`DocumentStore::add_documents`], but gives up with
    /// [`MmragError::Timeout`] if encoding takes longer than `timeout`.
    /// Nothing is committed on timeout.
    pub async fn add_documents_with_timeout(
        &self,
        units: Vec<ContentUnit>,
        timeout: Duration,
    ) -> MmragResult<()> {
        self.add_documents_inner(units, Some(timeout)).await
    }

    async fn add_documents_inner(
        &self,
        units: Vec<ContentUnit>,
        timeout: Option<Duration>,
    ) -> MmragResult<()> {
        if units.is_empty() {
            return Ok(());
        }
        let fused: Vec<FusedUnit> = fuse_batch(units)?;
        let texts: Vec<&str> = fused.iter().map(|f| f.text.as_str()).collect();
        let vectors = self.encode(&texts, timeout).await?;

        let records: Vec<StoredRecord> = fused
            .into_iter()
            .map(|f| StoredRecord {
                metadata: f.metadata,
                content: f.content,
            })
            .collect();
        let count = records.len();

        let mut state = self.state.write().await;
        state.commit(&self.config, vectors, records)?;
        info!(added = count, total = state.records.len(), "Added documents");
        Ok(())
    }

    /// Encode and check every vector: right count, right dimension, finite.
    async fn encode(
        &self,
        texts: &[&str],
        timeout: Option<Duration>,
    ) -> MmragResult<Vec<Vec<f32>>> {
        let vectors = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.embedder.embed_batch(texts))
                .await
                .map_err(|_| MmragError::Timeout(limit))??,
            None => self.embedder.embed_batch(texts).await?,
        };

        if vectors.len() != texts.len() {
            return Err(MmragError::Encoding(format!(
                "encoder returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != self.config.dimension {
                return Err(MmragError::Encoding(format!(
                    "vector {i} has dimension {} but the store expects {}",
                    v.len(),
                    self.config.dimension
                )));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(MmragError::Encoding(format!(
                    "vector {i} contains NaN or infinite values"
                )));
            }
        }
        Ok(vectors)
    }

    /// Top-`top_k` matches for `query`, best first.
    ///
    /// An empty store yields an empty list. Fewer than `top_k` results come
    /// back when fewer vectors are stored (or, for the partitioned index,
    /// when the probed partitions hold fewer).
    pub async fn search(&self, query: &str, top_k: usize) -> MmragResult<Vec<SearchResult>> {
        self.search_inner(query, top_k, None).await
    }

    /// Like [`DocumentStore::search`] with a deadline on query encoding.
    pub async fn search_with_timeout(
        &self,
        query: &str,
        top_k: usize,
        timeout: Duration,
    ) -> MmragResult<Vec<SearchResult>> {
        self.search_inner(query, top_k, Some(timeout)).await
    }

    async fn search_inner(
        &self,
        query: &str,
        top_k: usize,
        timeout: Option<Duration>,
    ) -> MmragResult<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(MmragError::InvalidQuery("top_k must be positive".into()));
        }
        if query.trim().is_empty() {
            return Err(MmragError::InvalidQuery("query is empty".into()));
        }
        if self.is_empty().await {
            debug!("Search on empty store");
            return Ok(Vec::new());
        }

        let mut vectors = self.encode(&[query], timeout).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| MmragError::Encoding("encoder returned no vector".into()))?;

        let state = self.state.read().await;
        let metric = state.index.metric();
        let neighbors = state.index.search(&query_vector, top_k)?;

        let mut results = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors.into_iter().filter(|n| n.is_match()) {
            let record = state.records.get(neighbor.position as usize).ok_or(
                MmragError::InconsistentStore {
                    index: state.index.len(),
                    metadata: state.records.len(),
                },
            )?;
            results.push(SearchResult {
                score: metric.score(neighbor.distance),
                metadata: record.metadata.clone(),
                content: record.content.clone(),
            });
        }
        debug!(hits = results.len(), top_k, "Search complete");
        Ok(results)
    }

    /// Number of stored vectors.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Whether nothing has been committed yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every metadata record, in position order.
    pub async fn list(&self) -> Vec<MetadataRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .map(|r| r.metadata.clone())
            .collect()
    }

    /// Verify that the index and the metadata agree in length.
    pub async fn check_consistency(&self) -> MmragResult<()> {
        self.state.read().await.check()
    }

    /// Write the index and metadata artifacts into `dir`.
    ///
    /// Concurrent calls are serialized, so the staging files of one save
    /// are never renamed away by another.
    pub async fn save(&self, dir: &Path) -> MmragResult<()> {
        let _snapshot = self.snapshot.lock().await;
        tokio::fs::create_dir_all(dir).await?;

        let state = self.state.read().await;
        state.check()?;
        let index_bytes = encode_index(&state.index)?;
        let mut metadata = String::new();
        for record in &state.records {
            metadata.push_str(&serde_json::to_string(record)?);
            metadata.push('\n');
        }
        let count = state.records.len();

        write_replace(&dir.join(INDEX_FILE), &index_bytes).await?;
        write_replace(&dir.join(METADATA_FILE), metadata.as_bytes()).await?;
        drop(state);

        info!(dir = %dir.display(), vectors = count, "Saved document store");
        Ok(())
    }

    /// Replace the store's contents with the snapshot in `dir`.
    ///
    /// Fails with [`MmragError::InconsistentStore`] if the two artifacts
    /// disagree in length; the current contents are kept in that case.
    pub async fn load(&self, dir: &Path) -> MmragResult<()> {
        let _snapshot = self.snapshot.lock().await;
        let index_bytes = tokio::fs::read(dir.join(INDEX_FILE)).await?;
        let metadata = tokio::fs::read_to_string(dir.join(METADATA_FILE)).await?;

        let index = decode_index(&index_bytes)?;
        if index.dimension() != self.config.dimension {
            return Err(MmragError::Index(format!(
                "snapshot has dimension {} but the store is configured for {}",
                index.dimension(),
                self.config.dimension
            )));
        }
        if index.metric() != self.config.metric {
            return Err(MmragError::Index(format!(
                "snapshot uses metric {} but the store is configured for {}",
                index.metric().as_str(),
                self.config.metric.as_str()
            )));
        }

        let mut records = Vec::new();
        for (line_no, line) in metadata.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord = serde_json::from_str(line).map_err(|e| {
                MmragError::Index(format!("invalid metadata record on line {}: {e}", line_no + 1))
            })?;
            records.push(record);
        }

        let loaded = StoreState { index, records };
        if let Err(e) = loaded.check() {
            warn!(dir = %dir.display(), error = %e, "Refusing inconsistent snapshot");
            return Err(e);
        }

        let count = loaded.records.len();
        *self.state.write().await = loaded;
        info!(dir = %dir.display(), vectors = count, "Loaded document store");
        Ok(())
    }
}

/// True when `dir` holds either snapshot artifact.
pub async fn snapshot_exists(dir: &Path) -> bool {
    let index = tokio::fs::try_exists(dir.join(INDEX_FILE)).await.unwrap_or(false);
    let metadata = tokio::fs::try_exists(dir.join(METADATA_FILE))
        .await
        .unwrap_or(false);
    index || metadata
}

/// Write to a sibling temp file, then rename over the target.
async fn write_replace(path: &Path, bytes: &[u8]) -> MmragResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::embedding::LocalEmbedding;
    use async_trait::async_trait;
    use mmrag_core::ContentType;

    fn store() -> DocumentStore {
        DocumentStore::new(StoreConfig::default(), Arc::new(LocalEmbedding::default())).unwrap()
    }

    /// Encoder that fails whenever a text contains "poison".
    struct FlakyEmbedding(LocalEmbedding);

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedding {
        async fn embed_batch(&self, texts: &[&str]) -> MmragResult<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("poison")) {
                return Err(MmragError::Encoding("model unavailable".into()));
            }
            self.0.embed_batch(texts).await
        }
        fn dimension(&self) -> usize {
            self.0.dimension()
        }
        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    /// Encoder that returns NaN vectors.
    struct NanEmbedding;

    #[async_trait]
    impl EmbeddingProvider for NanEmbedding {
        async fn embed_batch(&self, texts: &[&str]) -> MmragResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![f32::NAN; 4]).collect())
        }
        fn dimension(&self) -> usize {
            4
        }
        fn model_name(&self) -> &str {
            "nan"
        }
    }

    /// Encoder that never finishes in time.
    struct SlowEmbedding;

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedding {
        async fn embed_batch(&self, texts: &[&str]) -> MmragResult<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }
        fn dimension(&self) -> usize {
            4
        }
        fn model_name(&self) -> &str {
            "slow"
        }
    }

    fn small_config() -> StoreConfig {
        StoreConfig {
            dimension: 4,
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(StoreConfig::default().validate().is_ok());
        let bad = StoreConfig {
            partition_count: 2,
            probe_count: 3,
            ..StoreConfig::default()
        };
        assert!(matches!(bad.validate(), Err(MmragError::Config(_))));
        let zero = StoreConfig {
            dimension: 0,
            ..StoreConfig::default()
        };
        assert!(zero.validate().is_err());
        assert_eq!(StoreConfig::default().training_threshold(), None);
    }

    #[test]
    fn test_new_rejects_dimension_mismatch() {
        let result = DocumentStore::new(small_config(), Arc::new(LocalEmbedding::new(8)));
        assert!(matches!(result, Err(MmragError::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_store_search_is_empty() {
        let store = store();
        assert!(store.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_zero_top_k() {
        let store = store();
        assert!(matches!(
            store.search("revenue", 0).await,
            Err(MmragError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let store = store();
        store
            .add_documents(vec![
                ContentUnit::text("q1.pdf", "revenue grew 10%").on_page(1),
                ContentUnit::image("q1.pdf", "bar chart of revenue").on_page(2),
            ])
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        let results = store.search("revenue growth", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        for r in &results {
            assert!(r.score > 0.0 && r.score <= 1.0, "score {}", r.score);
            assert_eq!(r.metadata.source, "q1.pdf");
        }
        let types: Vec<ContentType> = results.iter().map(|r| r.metadata.content_type).collect();
        assert!(types.contains(&ContentType::Text));
        assert!(types.contains(&ContentType::Image));
    }

    #[tokio::test]
    async fn test_empty_unit_rejects_whole_batch() {
        let store = store();
        let err = store
            .add_documents(vec![
                ContentUnit::text("a.pdf", "valid text"),
                ContentUnit::with_content("b.pdf", ContentType::Text, Content::default()),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, MmragError::InvalidContent(_)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_encoding_failure_commits_nothing() {
        let store = DocumentStore::new(
            StoreConfig::default(),
            Arc::new(FlakyEmbedding(LocalEmbedding::default())),
        )
        .unwrap();
        store
            .add_documents(vec![ContentUnit::text("a.pdf", "first batch")])
            .await
            .unwrap();

        let err = store
            .add_documents(vec![
                ContentUnit::text("b.pdf", "fine"),
                ContentUnit::text("c.pdf", "poison pill"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, MmragError::Encoding(_)));
        assert_eq!(store.len().await, 1);
        store.check_consistency().await.unwrap();
    }

    #[tokio::test]
    async fn test_non_finite_vectors_are_rejected() {
        let store = DocumentStore::new(small_config(), Arc::new(NanEmbedding)).unwrap();
        let err = store
            .add_documents(vec![ContentUnit::text("a.pdf", "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, MmragError::Encoding(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_timeout_commits_nothing() {
        let store = DocumentStore::new(small_config(), Arc::new(SlowEmbedding)).unwrap();
        let err = store
            .add_documents_with_timeout(
                vec![ContentUnit::text("a.pdf", "text")],
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MmragError::Timeout(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = store();
        for i in 0..3 {
            store
                .add_documents(vec![ContentUnit::text(format!("doc{i}.txt"), format!("body {i}"))])
                .await
                .unwrap();
        }
        let sources: Vec<String> = store.list().await.into_iter().map(|m| m.source).collect();
        assert_eq!(sources, vec!["doc0.txt", "doc1.txt", "doc2.txt"]);
    }

    #[tokio::test]
    async fn test_migrates_to_partitioned_index_at_threshold() {
        let config = StoreConfig {
            partition_count: 2,
            probe_count: 2,
            min_points_per_partition: 3,
            ..StoreConfig::default()
        };
        let store = DocumentStore::new(config, Arc::new(LocalEmbedding::default())).unwrap();

        let units = |range: std::ops::Range<usize>| {
            range
                .map(|i| ContentUnit::text(format!("doc{i}.txt"), format!("topic{i} words{i}")))
                .collect::<Vec<_>>()
        };
        store.add_documents(units(0..4)).await.unwrap();
        assert!(matches!(store.state.read().await.index, VectorIndex::Flat(_)));

        store.add_documents(units(4..8)).await.unwrap();
        assert!(matches!(
            store.state.read().await.index,
            VectorIndex::Partitioned(_)
        ));
        assert_eq!(store.len().await, 8);
        store.check_consistency().await.unwrap();

        // Full probe: exact vectors come back first
        let hits = store.search("topic5 words5", 1).await.unwrap();
        assert_eq!(hits[0].metadata.source, "doc5.txt");
    }

    #[tokio::test]
    async fn test_save_and_open_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("store");
        let store = store();
        store
            .add_documents(vec![
                ContentUnit::text("a.txt", "solar panels on the roof"),
                ContentUnit::text("b.txt", "quarterly revenue figures"),
            ])
            .await
            .unwrap();
        store.save(&dir).await.unwrap();

        let reopened = DocumentStore::open(
            StoreConfig::default(),
            Arc::new(LocalEmbedding::default()),
            &dir,
        )
        .await
        .unwrap();
        assert_eq!(reopened.list().await, store.list().await);
        assert_eq!(
            reopened.search("revenue", 2).await.unwrap(),
            store.search("revenue", 2).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_load_rejects_mismatched_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        store
            .add_documents(vec![
                ContentUnit::text("a.txt", "one"),
                ContentUnit::text("b.txt", "two"),
            ])
            .await
            .unwrap();
        store.save(tmp.path()).await.unwrap();

        // Drop the last metadata line
        let path = tmp.path().join(METADATA_FILE);
        let data = std::fs::read_to_string(&path).unwrap();
        let first = data.lines().next().unwrap();
        std::fs::write(&path, format!("{first}\n")).unwrap();

        let fresh = self::store();
        let err = fresh.load(tmp.path()).await.unwrap_err();
        assert!(matches!(
            err,
            MmragError::InconsistentStore {
                index: 2,
                metadata: 1
            }
        ));
        assert!(fresh.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_rejects_other_metric() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store();
        store
            .add_documents(vec![ContentUnit::text("a.txt", "one two")])
            .await
            .unwrap();
        store.save(tmp.path()).await.unwrap();

        let ip = DocumentStore::new(
            StoreConfig {
                metric: Metric::InnerProduct,
                ..StoreConfig::default()
            },
            Arc::new(LocalEmbedding::default()),
        )
        .unwrap();
        assert!(matches!(ip.load(tmp.path()).await, Err(MmragError::Index(_))));
    }
}
