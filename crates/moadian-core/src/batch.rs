//! Batch extraction over a directory of invoice exports.
//!
//! Every source file produces a [`BatchOutcome`]; a file that fails to load
//! or parse is recorded as skipped and never aborts the batch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::invoice::{ExtractionResult, InvoiceExtractor};
use crate::models::invoice::InvoiceRecord;

/// File extensions picked up by [`discover_sources`].
pub const SOURCE_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xml"];

/// What happened to one source file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchResult {
    Extracted {
        record: InvoiceRecord,
        warnings: Vec<String>,
    },
    Skipped {
        reason: String,
    },
}

/// Per-file entry of a [`BatchReport`].
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub result: BatchResult,
}

impl BatchOutcome {
    pub fn from_extraction(path: PathBuf, result: crate::Result<ExtractionResult>) -> Self {
        let result = match result {
            Ok(extracted) => BatchResult::Extracted {
                record: extracted.record,
                warnings: extracted.warnings,
            },
            Err(e) => BatchResult::Skipped {
                reason: format!("{} failed: {}", e.stage(), e),
            },
        };
        Self { path, result }
    }

    pub fn record(&self) -> Option<&InvoiceRecord> {
        match &self.result {
            BatchResult::Extracted { record, .. } => Some(record),
            BatchResult::Skipped { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match &self.result {
            BatchResult::Extracted { warnings, .. } => warnings,
            BatchResult::Skipped { .. } => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.result {
            BatchResult::Extracted { .. } => None,
            BatchResult::Skipped { reason } => Some(reason),
        }
    }

    /// File name for display, falling back to the full path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Outcomes of a batch run, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: BatchOutcome) {
        if let Some(reason) = outcome.skip_reason() {
            warn!("Skipping {}: {}", outcome.path.display(), reason);
        }
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    /// Extracted records, in input order.
    pub fn records(&self) -> impl Iterator<Item = &InvoiceRecord> {
        self.outcomes.iter().filter_map(BatchOutcome::record)
    }

    /// Skipped files with their reasons.
    pub fn skipped(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.skip_reason().map(|r| (o.path.as_path(), r)))
    }

    pub fn extracted_count(&self) -> usize {
        self.records().count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True when no file yielded a record.
    pub fn is_total_failure(&self) -> bool {
        self.extracted_count() == 0
    }
}

impl FromIterator<BatchOutcome> for BatchReport {
    fn from_iter<I: IntoIterator<Item = BatchOutcome>>(iter: I) -> Self {
        let mut report = BatchReport::new();
        for outcome in iter {
            report.push(outcome);
        }
        report
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

/// Spreadsheet files directly inside `dir`, sorted by path.
pub fn discover_sources(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_source_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extract every path sequentially.
pub fn run_batch<E: InvoiceExtractor>(extractor: &E, paths: &[PathBuf]) -> BatchReport {
    let report: BatchReport = paths
        .iter()
        .map(|path| BatchOutcome::from_extraction(path.clone(), extractor.extract_file(path)))
        .collect();

    info!(
        "Batch finished: {} extracted, {} skipped",
        report.extracted_count(),
        report.len() - report.extracted_count()
    );
    report
}
