//! Labeled invoice header fields (dates, numbers, serials).

use regex::Regex;

use super::patterns::{CREATION_DATE, ISSUE_DATE, PRINCIPAL_NUMBER, SERIAL_NUMBER, TAX_MEMORY_SERIAL};
use super::FieldExtractor;
use crate::models::invoice::meta_keys;

/// Extracts the value following one exact label.
#[derive(Debug, Clone, Copy)]
pub struct LabeledFieldExtractor {
    key: &'static str,
    pattern: &'static Regex,
}

impl LabeledFieldExtractor {
    pub fn new(key: &'static str, pattern: &'static Regex) -> Self {
        Self { key, pattern }
    }

    /// Metadata key the value is stored under.
    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl FieldExtractor for LabeledFieldExtractor {
    type Output = String;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|value| value.as_str().to_string())
            .collect()
    }
}

/// Extractors for the invoice header fields, keyed by their metadata names.
pub fn header_field_extractors() -> [LabeledFieldExtractor; 5] {
    [
        LabeledFieldExtractor::new(meta_keys::ISSUE_DATE, &ISSUE_DATE),
        LabeledFieldExtractor::new(meta_keys::CREATION_DATE, &CREATION_DATE),
        LabeledFieldExtractor::new(meta_keys::PRINCIPAL_NUMBER, &PRINCIPAL_NUMBER),
        LabeledFieldExtractor::new(meta_keys::SERIAL_NUMBER, &SERIAL_NUMBER),
        LabeledFieldExtractor::new(meta_keys::TAX_MEMORY_SERIAL, &TAX_MEMORY_SERIAL),
    ]
}
