//! Core types and error definitions for the mmrag retrieval stack.
//!
//! This crate provides the foundational types shared across all mmrag crates:
//! the content model that extracted document fragments are expressed in, the
//! provenance records stored next to every vector, and the error taxonomy.
//!
//! # Main types
//!
//! - [`MmragError`]: Unified error enum for all mmrag subsystems.
//! - [`MmragResult`]: Convenience alias for `Result<T, MmragError>`.
//! - [`ContentUnit`]: One fusable piece of extracted information.
//! - [`Table`]: Row/column data attached to a content unit.
//! - [`MetadataRecord`]: Provenance of a stored vector.
//! - [`SearchResult`]: A scored hit returned by the document store.

/// Content model: units, tables, provenance records and search hits.
pub mod content;

pub use content::{Content, ContentType, ContentUnit, MetadataRecord, SearchResult, Table};

use std::time::Duration;

// --- Error types ---

/// Top-level error type for the mmrag stack.
///
/// Each variant corresponds to one failure class of the ingestion or query path.
#[derive(Debug, thiserror::Error)]
pub enum MmragError {
    /// The file extension is not in the configured allow-list, or no
    /// extractor is registered for it.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A content unit cannot be fused (no text, caption or table).
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// A query is malformed (blank text, `top_k == 0`).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The embedding model failed or produced unusable vectors.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A partitioned index was used before it was trained.
    #[error("Index not trained: {0}")]
    IndexNotTrained(String),

    /// Any other vector index failure (dimension mismatch, corrupt artifact).
    #[error("Index error: {0}")]
    Index(String),

    /// The index and the metadata sequence disagree in length.
    #[error("Inconsistent store: index holds {index} vectors but metadata holds {metadata} records")]
    InconsistentStore {
        /// Number of vectors in the index.
        index: usize,
        /// Number of metadata records.
        metadata: usize,
    },

    /// A document extractor failed (malformed document, OCR failure).
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// An image or table analyzer failed.
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// The answer-synthesis backend failed.
    #[error("LLM error: {0}")]
    Llm(String),

    /// An operation exceeded its caller-specified deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MmragError {
    /// Returns true for errors caused by the caller's input rather than by
    /// the system (surfaced as HTTP 400 by the gateway).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MmragError::UnsupportedFormat(_)
                | MmragError::InvalidContent(_)
                | MmragError::InvalidQuery(_)
        )
    }
}

/// A convenience `Result` alias using [`MmragError`].
pub type MmragResult<T> = Result<T, MmragError>;
