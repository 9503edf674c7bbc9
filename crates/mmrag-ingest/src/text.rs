use crate::extractor::{DocumentExtractor, ExtractionResult};
use async_trait::async_trait;
use mmrag_core::{MmragError, MmragResult};
use std::path::Path;

/// Extractor for plain-text and Markdown files.
#[derive(Debug, Default)]
pub struct TextExtractor;

impl TextExtractor {
    /// Stateless; same as [`Default::default`].
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentExtractor for TextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn formats(&self) -> &[&str] {
        &["txt", "md"]
    }

    async fn process(&self, path: &Path) -> MmragResult<ExtractionResult> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes).map_err(|e| {
            MmragError::Extraction(format!("{} is not valid UTF-8: {e}", path.display()))
        })?;
        Ok(ExtractionResult {
            text: Some(text),
            ..ExtractionResult::default()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extracts_utf8_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.md");
        std::fs::write(&path, "# Notes\nrevenue grew").unwrap();

        let result = TextExtractor::new().process(&path).await.unwrap();
        assert_eq!(result.text.as_deref(), Some("# Notes\nrevenue grew"));
        assert!(result.images.is_empty());
        assert!(result.tables.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_binary_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("blob.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = TextExtractor::new().process(&path).await.unwrap_err();
        assert!(matches!(err, MmragError::Extraction(_)));
    }
}
