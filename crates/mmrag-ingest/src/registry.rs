use crate::extractor::DocumentExtractor;
use crate::text::TextExtractor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Maps lower-case file extensions to document extractors.
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry with the built-in extractors (`txt`, `md`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextExtractor::new()));
        registry
    }

    /// Register an extractor for every format it declares. A later
    /// registration for the same format replaces the earlier one.
    pub fn register(&mut self, extractor: Arc<dyn DocumentExtractor>) {
        for format in extractor.formats() {
            let format = format.to_ascii_lowercase();
            info!(extractor = %extractor.name(), format = %format, "Registered extractor");
            self.extractors.insert(format, Arc::clone(&extractor));
        }
    }

    /// Extractor for `format`, matched case-insensitively.
    pub fn get(&self, format: &str) -> Option<Arc<dyn DocumentExtractor>> {
        self.extractors.get(&format.to_ascii_lowercase()).cloned()
    }

    /// Registered formats, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    /// Number of registered formats.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether no format is registered.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
