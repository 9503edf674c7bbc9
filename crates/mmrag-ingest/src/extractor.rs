use async_trait::async_trait;
use mmrag_core::{MmragResult, Table};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An image pulled out of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Page the image was found on.
    #[serde(default)]
    pub page: u32,
    /// Image format hint (`png`, `jpeg`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Encoded image bytes. Not part of API responses.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// A table pulled out of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Page (or sheet index) the table was found on.
    #[serde(default)]
    pub page: u32,
    /// Sheet or caption name, when the format has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cell contents as extracted.
    pub table: Table,
}

/// Everything an extractor found in one document. Any part may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Full document text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Embedded images, in document order.
    #[serde(default)]
    pub images: Vec<ExtractedImage>,
    /// Tables, in document order.
    #[serde(default)]
    pub tables: Vec<ExtractedTable>,
}

/// Trait for per-format document extractors (PDF, Word, Excel, ...).
///
/// Implementations are selected by file extension through the
/// [`ExtractorRegistry`](crate::ExtractorRegistry).
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Human-readable extractor name, used in logs.
    fn name(&self) -> &str;

    /// Lower-case file extensions this extractor handles, without the dot.
    fn formats(&self) -> &[&str];

    /// Extract text, images and tables from the file at `path`.
    async fn process(&self, path: &Path) -> MmragResult<ExtractionResult>;
}
