use mmrag_core::{Content, ContentType, SearchResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One retrieved piece of content, ready to be shown to the answer model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Text or table payload.
    #[serde(flatten)]
    pub content: Content,
    /// File the content came from.
    pub source: String,
    /// Kind of unit.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Page within the source, 0 when unknown.
    pub page: u32,
    /// Similarity score in `(0, 1]`.
    pub score: f32,
}

impl From<&SearchResult> for ContextItem {
    fn from(result: &SearchResult) -> Self {
        Self {
            content: result.content.clone(),
            source: result.metadata.source.clone(),
            content_type: result.metadata.content_type,
            page: result.metadata.page,
            score: result.score,
        }
    }
}

impl ContextItem {
    /// Labelled block: content lines, a source line, then a `---` separator.
    pub fn render(&self) -> String {
        let mut block = String::new();
        if let Some(text) = self.content.present_text() {
            let _ = writeln!(block, "Text: {text}");
        }
        if let Some(caption) = self.content.present_caption() {
            let _ = writeln!(block, "Image description: {caption}");
        }
        if let Some(table) = self.content.present_table() {
            let _ = writeln!(block, "Table: {}", table.to_canonical_json());
        }
        let _ = writeln!(block, "Source: {} (page {})", self.source, self.page);
        block.push_str("---\n");
        block
    }
}

/// Context items in retrieval order.
pub fn assemble_context(results: &[SearchResult]) -> Vec<ContextItem> {
    results.iter().map(ContextItem::from).collect()
}

/// Labelled context blocks, one per item, in order.
pub fn render_context(items: &[ContextItem]) -> String {
    items.iter().map(ContextItem::render).collect()
}
