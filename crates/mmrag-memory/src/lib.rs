//! Retrieval core: content fusion, embeddings, vector index and the
//! multimodal document store.
//!
//! # Main types
//!
//! - [`DocumentStore`]: Encoder + index + metadata with add/search/save/load.
//! - [`StoreConfig`]: Dimension, metric and partitioning settings.
//! - [`EmbeddingProvider`]: Trait for text encoders.
//! - [`LocalEmbedding`]: Deterministic local hashing encoder.
//! - [`VectorIndex`]: Exact ([`FlatIndex`]) or partitioned ([`IvfIndex`]) k-NN index.
//! - [`fuse`]: Content unit to embeddable text.

/// Binary artifact for the vector index.
pub mod codec;
/// Embedding provider trait and implementations.
pub mod embedding;
/// Content fusion.
pub mod fusion;
/// Exact and partitioned vector indexes.
pub mod index;
/// The document store.
pub mod store;

#[cfg(feature = "http-embeddings")]
pub use embedding::{HttpEmbedding, HttpEmbeddingConfig};
pub use embedding::{EmbeddingProvider, LocalEmbedding};
pub use fusion::{fuse, fuse_batch, fuse_content, FusedUnit};
pub use index::{FlatIndex, IndexKind, IvfIndex, Metric, Neighbor, VectorIndex, NO_MATCH};
pub use store::{DocumentStore, StoreConfig, INDEX_FILE, METADATA_FILE};
