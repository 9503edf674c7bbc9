use crate::extractor::ExtractedImage;
use async_trait::async_trait;
use mmrag_core::{MmragResult, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What an image analyzer reports for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Natural-language description; `None` for feature-only models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Image embedding from the vision model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<f32>,
}

/// Captioning / feature model for extracted images.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyze a batch; returns exactly one entry per input image, in order.
    async fn process_batch(&self, images: &[ExtractedImage]) -> MmragResult<Vec<ImageAnalysis>>;
}

/// What a table analyzer reports for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAnalysis {
    /// Normalized table content that gets embedded.
    pub table: Table,
    /// Column names. Row tables keep header order. Record tables list keys
    /// by first appearance, with each record's keys in sorted order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// `(rows, columns)` after truncation.
    pub shape: (usize, usize),
    /// Answer to the caller's question, if a QA model is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa: Option<serde_json::Value>,
}

/// Table normalization and optional table question answering.
#[async_trait]
pub trait TableAnalyzer: Send + Sync {
    /// Analyze a batch; returns exactly one entry per input table, in order.
    /// `questions`, when given, pairs one question with each table.
    async fn batch_process_tables(
        &self,
        tables: &[Table],
        questions: Option<&[String]>,
    ) -> MmragResult<Vec<TableAnalysis>>;
}

/// Built-in table analyzer: turns header rows into records and caps the
/// table at `max_rows` x `max_columns`. It has no QA model, so `qa` stays
/// empty.
#[derive(Debug, Clone)]
pub struct TruncatingTableAnalyzer {
    max_rows: usize,
    max_columns: usize,
}

impl TruncatingTableAnalyzer {
    /// Analyzer keeping at most `max_rows` rows and `max_columns` columns.
    pub fn new(max_rows: usize, max_columns: usize) -> Self {
        Self {
            max_rows,
            max_columns,
        }
    }

    /// Normalize and truncate one table.
    pub fn analyze(&self, table: &Table) -> TableAnalysis {
        match table {
            Table::Rows(rows) => {
                let Some((header, body)) = rows.split_first() else {
                    return self.finish(Vec::new(), Vec::new());
                };
                let columns: Vec<String> = header
                    .iter()
                    .take(self.max_columns)
                    .enumerate()
                    .map(|(i, cell)| column_name(cell, i))
                    .collect();
                let records = body
                    .iter()
                    .take(self.max_rows)
                    .map(|row| {
                        columns
                            .iter()
                            .enumerate()
                            .map(|(i, col)| {
                                let cell = row.get(i).cloned().unwrap_or(serde_json::Value::Null);
                                (col.clone(), cell)
                            })
                            .collect()
                    })
                    .collect();
                self.finish(columns, records)
            }
            Table::Records(records) => {
                let mut columns: Vec<String> = Vec::new();
                for record in records {
                    for key in record.keys() {
                        if !columns.contains(key) {
                            columns.push(key.clone());
                        }
                    }
                }
                columns.truncate(self.max_columns);
                let records = records
                    .iter()
                    .take(self.max_rows)
                    .map(|record| {
                        record
                            .iter()
                            .filter(|(key, _)| columns.contains(key))
                            .map(|(key, value)| (key.clone(), value.clone()))
                            .collect()
                    })
                    .collect();
                self.finish(columns, records)
            }
        }
    }

    fn finish(
        &self,
        columns: Vec<String>,
        records: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> TableAnalysis {
        TableAnalysis {
            shape: (records.len(), columns.len()),
            table: Table::Records(records),
            columns,
            qa: None,
        }
    }
}

fn column_name(cell: &serde_json::Value, index: usize) -> String {
    match cell {
        serde_json::Value::String(s) if !s.trim().is_empty() => s.clone(),
        serde_json::Value::Null => format!("column_{index}"),
        serde_json::Value::String(_) => format!("column_{index}"),
        other => other.to_string(),
    }
}

#[async_trait]
impl TableAnalyzer for TruncatingTableAnalyzer {
    async fn batch_process_tables(
        &self,
        tables: &[Table],
        questions: Option<&[String]>,
    ) -> MmragResult<Vec<TableAnalysis>> {
        if questions.is_some() {
            debug!("No table QA model configured; questions ignored");
        }
        Ok(tables.iter().map(|t| self.analyze(t)).collect())
    }
}
