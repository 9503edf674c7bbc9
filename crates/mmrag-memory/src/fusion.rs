use mmrag_core::{Content, ContentUnit, MetadataRecord, MmragError, MmragResult};

/// Label placed in front of an image caption inside fused text.
pub const IMAGE_LABEL: &str = "[image description]";
/// Label placed in front of serialized table data inside fused text.
pub const TABLE_LABEL: &str = "[table content]";

/// A content unit after fusion: the text to embed plus what gets stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedUnit {
    /// Deterministic text handed to the encoder.
    pub text: String,
    /// Provenance stored next to the vector.
    pub metadata: MetadataRecord,
    /// Original payload, kept for context assembly.
    pub content: Content,
}

/// Build the fused text for a content payload.
///
/// Segments appear in fixed order (text, caption, table) separated by one
/// space; absent or blank segments are skipped. Returns `None` when nothing
/// is present.
pub fn fuse_content(content: &Content) -> Option<String> {
    let mut segments: Vec<String> = Vec::with_capacity(3);
    if let Some(text) = content.present_text() {
        segments.push(text.to_string());
    }
    if let Some(caption) = content.present_caption() {
        segments.push(format!("{IMAGE_LABEL} {caption}"));
    }
    if let Some(table) = content.present_table() {
        segments.push(format!("{TABLE_LABEL} {}", table.to_canonical_json()));
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" "))
    }
}

/// Fuse one content unit, rejecting units that carry no content.
pub fn fuse(unit: ContentUnit) -> MmragResult<FusedUnit> {
    let text = fuse_content(&unit.content).ok_or_else(|| {
        MmragError::InvalidContent(format!(
            "{} unit from '{}' (page {}) has no text, caption or table",
            unit.content_type, unit.source, unit.page
        ))
    })?;
    let metadata = unit.metadata();
    Ok(FusedUnit {
        text,
        metadata,
        content: unit.content,
    })
}

/// Fuse a batch, failing on the first empty unit without fusing the rest.
///
/// The error names the position of the offending unit in the batch.
pub fn fuse_batch(units: Vec<ContentUnit>) -> MmragResult<Vec<FusedUnit>> {
    units
        .into_iter()
        .enumerate()
        .map(|(i, unit)| {
            fuse(unit).map_err(|e| match e {
                MmragError::InvalidContent(msg) => {
                    MmragError::InvalidContent(format!("unit {i}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}
