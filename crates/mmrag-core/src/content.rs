use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance tag of a content unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Raw document text.
    #[default]
    Text,
    /// A caption derived from an image.
    Image,
    /// Row/column data.
    Table,
}

impl ContentType {
    /// Lower-case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Table => "table",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured table data, either as positional rows or as records.
///
/// Serialization goes through `serde_json`, whose default object map is
/// ordered, so the same table always renders to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Table {
    /// Ordered rows of ordered cells; the first row is often a header.
    Rows(Vec<Vec<serde_json::Value>>),
    /// One object per row, keyed by column name.
    Records(Vec<serde_json::Map<String, serde_json::Value>>),
}

impl Table {
    /// Number of rows (header row included for [`Table::Rows`]).
    pub fn row_count(&self) -> usize {
        match self {
            Table::Rows(rows) => rows.len(),
            Table::Records(records) => records.len(),
        }
    }

    /// A table without rows carries nothing to embed.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Canonical compact JSON encoding used for fusion and context rendering.
    pub fn to_canonical_json(&self) -> String {
        // Values built from `serde_json::Value` always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The payload of a content unit: any subset of text, caption and table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Raw document text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Description derived from an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Row/column data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
}

impl Content {
    /// The text, if present and not blank.
    pub fn present_text(&self) -> Option<&str> {
        non_blank(self.text.as_deref())
    }

    /// The caption, if present and not blank.
    pub fn present_caption(&self) -> Option<&str> {
        non_blank(self.caption.as_deref())
    }

    /// The table, if present and holding at least one row.
    pub fn present_table(&self) -> Option<&Table> {
        self.table.as_ref().filter(|t| !t.is_empty())
    }

    /// True when none of text, caption or table is present.
    pub fn is_empty(&self) -> bool {
        self.present_text().is_none()
            && self.present_caption().is_none()
            && self.present_table().is_none()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// One fusable piece of extracted information prior to embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Text, caption and/or table.
    #[serde(flatten)]
    pub content: Content,
    /// Originating document identifier (file name).
    pub source: String,
    /// Provenance tag.
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    /// Page or location hint.
    #[serde(default)]
    pub page: u32,
}

impl ContentUnit {
    /// A text unit.
    pub fn text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_content(
            source,
            ContentType::Text,
            Content {
                text: Some(text.into()),
                ..Content::default()
            },
        )
    }

    /// An image unit described by its caption.
    pub fn image(source: impl Into<String>, caption: impl Into<String>) -> Self {
        Self::with_content(
            source,
            ContentType::Image,
            Content {
                caption: Some(caption.into()),
                ..Content::default()
            },
        )
    }

    /// A table unit.
    pub fn table(source: impl Into<String>, table: Table) -> Self {
        Self::with_content(
            source,
            ContentType::Table,
            Content {
                table: Some(table),
                ..Content::default()
            },
        )
    }

    /// A unit with arbitrary content, on page 0.
    pub fn with_content(
        source: impl Into<String>,
        content_type: ContentType,
        content: Content,
    ) -> Self {
        Self {
            content,
            source: source.into(),
            content_type,
            page: 0,
        }
    }

    /// Set the page hint. Chainable builder method.
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Provenance record for this unit.
    pub fn metadata(&self) -> MetadataRecord {
        MetadataRecord {
            source: self.source.clone(),
            content_type: self.content_type,
            page: self.page,
        }
    }
}

/// Provenance of one stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Originating document identifier.
    pub source: String,
    /// Provenance tag.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Page or location hint.
    pub page: u32,
}

/// A scored hit returned by the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Similarity in `(0, 1]`, higher is better.
    pub score: f32,
    /// Provenance of the matched vector.
    pub metadata: MetadataRecord,
    /// Original content the vector was built from.
    #[serde(default)]
    pub content: Content,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_serialization() {
        assert_eq!(serde_json::to_string(&ContentType::Image).unwrap(), "\"image\"");
        let t: ContentType = serde_json::from_str("\"table\"").unwrap();
        assert_eq!(t, ContentType::Table);
        assert_eq!(ContentType::Text.to_string(), "text");
    }

    #[test]
    fn test_blank_fields_count_as_absent() {
        let content = Content {
            text: Some("   ".into()),
            caption: Some(String::new()),
            table: Some(Table::Rows(vec![])),
        };
        assert!(content.is_empty());

        let content = Content {
            caption: Some("a chart".into()),
            ..Content::default()
        };
        assert!(!content.is_empty());
        assert_eq!(content.present_caption(), Some("a chart"));
    }

    #[test]
    fn test_unit_json_shape() {
        let unit = ContentUnit::text("q1.pdf", "revenue grew 10%").on_page(1);
        let value = serde_json::to_value(&unit).unwrap();
        assert_eq!(
            value,
            json!({"text": "revenue grew 10%", "source": "q1.pdf", "type": "text", "page": 1})
        );

        let parsed: ContentUnit =
            serde_json::from_value(json!({"caption": "bar chart", "source": "q1.pdf", "type": "image"}))
                .unwrap();
        assert_eq!(parsed.page, 0);
        assert_eq!(parsed.content_type, ContentType::Image);
        assert_eq!(parsed.content.caption.as_deref(), Some("bar chart"));
    }

    #[test]
    fn test_table_untagged_forms() {
        let rows: Table = serde_json::from_value(json!([["year", "revenue"], [2023, 10]])).unwrap();
        assert!(matches!(rows, Table::Rows(ref r) if r.len() == 2));

        let records: Table =
            serde_json::from_value(json!([{"year": 2023, "revenue": 10}])).unwrap();
        assert!(matches!(records, Table::Records(ref r) if r.len() == 1));
    }

    #[test]
    fn test_table_canonical_json_sorts_keys() {
        let a: Table = serde_json::from_str(r#"[{"b": 1, "a": 2}]"#).unwrap();
        let b: Table = serde_json::from_str(r#"[{"a": 2, "b": 1}]"#).unwrap();
        assert_eq!(a.to_canonical_json(), b.to_canonical_json());
    }

    #[test]
    fn test_metadata_from_unit() {
        let unit = ContentUnit::image("deck.pptx", "logo").on_page(4);
        let meta = unit.metadata();
        assert_eq!(meta.source, "deck.pptx");
        assert_eq!(meta.content_type, ContentType::Image);
        assert_eq!(meta.page, 4);
    }
}
