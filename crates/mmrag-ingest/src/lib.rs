//! Document ingestion for mmrag.
//!
//! Uploaded files are checked against the allow-list, staged in a temp
//! directory, handed to the extractor registered for their extension, and
//! the extracted text, image captions and tables are committed to the
//! document store as content units in a single transactional add.

/// Image and table analysis.
pub mod analyzer;
/// Extractor trait and extraction results.
pub mod extractor;
/// Upload staging and ingestion.
pub mod ingestor;
/// Extension-to-extractor registry.
pub mod registry;
/// Plain text and Markdown extraction.
pub mod text;

pub use analyzer::{ImageAnalysis, ImageAnalyzer, TableAnalysis, TableAnalyzer, TruncatingTableAnalyzer};
pub use extractor::{DocumentExtractor, ExtractedImage, ExtractedTable, ExtractionResult};
pub use ingestor::{extension_of, IngestConfig, IngestReport, Ingestor};
pub use registry::ExtractorRegistry;
pub use text::TextExtractor;
