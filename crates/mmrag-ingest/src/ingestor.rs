use crate::analyzer::{ImageAnalysis, ImageAnalyzer, TableAnalysis, TableAnalyzer, TruncatingTableAnalyzer};
use crate::extractor::{DocumentExtractor, ExtractionResult};
use crate::registry::ExtractorRegistry;
use chrono::{DateTime, Utc};
use mmrag_core::{ContentUnit, MmragError, MmragResult, Table};
use mmrag_memory::DocumentStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Allowed file extensions, lower-case, without the dot.
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,
    /// Where uploads are staged while they are processed.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Rows kept per table before truncation.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Columns kept per table before truncation.
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
    /// Images sent to the image analyzer per call.
    #[serde(default = "default_image_batch_size")]
    pub image_batch_size: usize,
    /// Deadline in seconds for encoding a file's units; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_supported_formats() -> Vec<String> {
    ["pdf", "docx", "xlsx", "txt", "md"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
fn default_temp_dir() -> PathBuf {
    PathBuf::from("./data/tmp")
}
fn default_max_rows() -> usize {
    100
}
fn default_max_columns() -> usize {
    20
}
fn default_image_batch_size() -> usize {
    8
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            supported_formats: default_supported_formats(),
            temp_dir: default_temp_dir(),
            max_rows: default_max_rows(),
            max_columns: default_max_columns(),
            image_batch_size: default_image_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl IngestConfig {
    /// Encoding deadline, or `None` when `timeout_secs` is 0.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Outcome of ingesting one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// File name the units are attributed to.
    pub source: String,
    /// Lower-case extension that selected the extractor.
    pub format: String,
    /// Extracted text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// One entry per extracted image.
    #[serde(default)]
    pub image_analysis: Vec<ImageAnalysis>,
    /// One entry per extracted table.
    #[serde(default)]
    pub table_analysis: Vec<TableAnalysis>,
    /// Content units committed to the document store.
    pub units_added: usize,
    /// When the units were committed.
    pub ingested_at: DateTime<Utc>,
}

/// Ingestion entry point: allow-list check, extraction, analysis, fusion
/// into content units, and one transactional `add_documents` per file.
pub struct Ingestor {
    config: IngestConfig,
    registry: ExtractorRegistry,
    image_analyzer: Option<Arc<dyn ImageAnalyzer>>,
    table_analyzer: Arc<dyn TableAnalyzer>,
    store: Arc<DocumentStore>,
}

impl Ingestor {
    /// Ingestor with the truncating table analyzer and no image analyzer.
    pub fn new(config: IngestConfig, registry: ExtractorRegistry, store: Arc<DocumentStore>) -> Self {
        let table_analyzer = Arc::new(TruncatingTableAnalyzer::new(
            config.max_rows,
            config.max_columns,
        ));
        Self {
            config,
            registry,
            image_analyzer: None,
            table_analyzer,
            store,
        }
    }

    /// Attach an image captioning model. Chainable builder method.
    pub fn with_image_analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.image_analyzer = Some(analyzer);
        self
    }

    /// Replace the built-in table analyzer. Chainable builder method.
    pub fn with_table_analyzer(mut self, analyzer: Arc<dyn TableAnalyzer>) -> Self {
        self.table_analyzer = analyzer;
        self
    }

    /// Active settings.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Store the units are committed to.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Resolve the extractor for `filename`, enforcing the allow-list.
    pub fn extractor_for(&self, filename: &str) -> MmragResult<(String, Arc<dyn DocumentExtractor>)> {
        let format = extension_of(filename)
            .ok_or_else(|| MmragError::UnsupportedFormat(format!("'{filename}' has no extension")))?;
        if !self
            .config
            .supported_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(&format))
        {
            return Err(MmragError::UnsupportedFormat(format!(
                "'{format}' is not an allowed format"
            )));
        }
        let extractor = self.registry.get(&format).ok_or_else(|| {
            MmragError::UnsupportedFormat(format!("no extractor registered for '{format}'"))
        })?;
        Ok((format, extractor))
    }

    /// Ingest an uploaded file.
    ///
    /// The bytes are staged under the temp directory and the staged file is
    /// removed afterwards, whether processing succeeded or not. Unsupported
    /// formats are rejected before anything is written.
    pub async fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> MmragResult<IngestReport> {
        let source = file_name_of(filename)
            .ok_or_else(|| MmragError::UnsupportedFormat(format!("invalid file name '{filename}'")))?;
        let (format, extractor) = self.extractor_for(&source)?;

        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        let staged = self
            .config
            .temp_dir
            .join(format!("{}-{source}", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&staged, bytes).await {
            remove_staged(&staged).await;
            return Err(e.into());
        }

        let result = self.process(extractor.as_ref(), &staged, &source, &format).await;

        remove_staged(&staged).await;
        result
    }

    /// Ingest a file that already lives on disk (no staging copy).
    pub async fn ingest_path(&self, path: &Path) -> MmragResult<IngestReport> {
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                MmragError::UnsupportedFormat(format!("invalid file name '{}'", path.display()))
            })?;
        let (format, extractor) = self.extractor_for(&source)?;
        self.process(extractor.as_ref(), path, &source, &format).await
    }

    async fn process(
        &self,
        extractor: &dyn DocumentExtractor,
        path: &Path,
        source: &str,
        format: &str,
    ) -> MmragResult<IngestReport> {
        info!(source = %source, extractor = %extractor.name(), "Extracting document");
        let ExtractionResult {
            text,
            images,
            tables,
        } = extractor.process(path).await?;

        let image_analysis = self.analyze_images(&images).await?;
        let raw_tables: Vec<Table> = tables.iter().map(|t| t.table.clone()).collect();
        let table_analysis = if raw_tables.is_empty() {
            Vec::new()
        } else {
            let out = self
                .table_analyzer
                .batch_process_tables(&raw_tables, None)
                .await?;
            expect_len("table", out.len(), raw_tables.len())?;
            out
        };

        let mut units = Vec::new();
        if let Some(body) = text.as_deref().filter(|t| !t.trim().is_empty()) {
            units.push(ContentUnit::text(source, body));
        }
        for (image, analysis) in images.iter().zip(image_analysis.iter()) {
            if let Some(caption) = analysis.caption.as_deref().filter(|c| !c.trim().is_empty()) {
                units.push(ContentUnit::image(source, caption).on_page(image.page));
            }
        }
        for (table, analysis) in tables.iter().zip(table_analysis.iter()) {
            if !analysis.table.is_empty() {
                units.push(ContentUnit::table(source, analysis.table.clone()).on_page(table.page));
            }
        }

        let units_added = units.len();
        if units.is_empty() {
            warn!(source = %source, "Document produced no indexable content");
        } else {
            match self.config.timeout() {
                Some(limit) => self.store.add_documents_with_timeout(units, limit).await?,
                None => self.store.add_documents(units).await?,
            }
        }
        info!(source = %source, units = units_added, "Ingested document");

        Ok(IngestReport {
            source: source.to_string(),
            format: format.to_string(),
            text,
            image_analysis,
            table_analysis,
            units_added,
            ingested_at: Utc::now(),
        })
    }

    async fn analyze_images(
        &self,
        images: &[crate::extractor::ExtractedImage],
    ) -> MmragResult<Vec<ImageAnalysis>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let Some(analyzer) = &self.image_analyzer else {
            warn!(count = images.len(), "No image analyzer configured; images skipped");
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(images.len());
        for batch in images.chunks(self.config.image_batch_size.max(1)) {
            let out = analyzer.process_batch(batch).await?;
            expect_len("image", out.len(), batch.len())?;
            results.extend(out);
        }
        Ok(results)
    }
}

async fn remove_staged(staged: &Path) {
    match tokio::fs::remove_file(staged).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staged.display(), error = %e, "Failed to remove staged upload"),
    }
}

fn expect_len(kind: &str, got: usize, want: usize) -> MmragResult<()> {
    if got != want {
        return Err(MmragError::Analyzer(format!(
            "{kind} analyzer returned {got} results for {want} inputs"
        )));
    }
    Ok(())
}

/// Lower-case extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Final path component of a client-supplied name; strips directories.
fn file_name_of(filename: &str) -> Option<String> {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Report.PDF"), Some("pdf".into()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".into()));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".hidden"), None);
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name_of("../../etc/passwd.txt"), Some("passwd.txt".into()));
        assert_eq!(file_name_of("C:\\Users\\me\\q1.pdf"), Some("q1.pdf".into()));
        assert_eq!(file_name_of("notes.md"), Some("notes.md".into()));
        assert_eq!(file_name_of(""), None);
    }

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert!(config.supported_formats.contains(&"xlsx".to_string()));
        assert_eq!(config.max_rows, 100);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = IngestConfig {
            timeout_secs: 0,
            ..IngestConfig::default()
        };
        assert_eq!(config.timeout(), None);
    }
}
