//! Error types for the moadian-core library.

use thiserror::Error;

/// Main error type for the moadian library.
#[derive(Error, Debug)]
pub enum MoadianError {
    /// Source workbook could not be read.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Output template could not be filled.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MoadianError {
    /// Short name of the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            MoadianError::Load(_) => "load",
            MoadianError::Extraction(_) => "extract",
            MoadianError::Template(_) => "populate",
            MoadianError::Io(_) => "io",
            MoadianError::Config(_) => "config",
        }
    }
}

/// Errors raised while turning a source file into a grid.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read from disk.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Content is neither XML spreadsheet markup nor a workbook.
    #[error("unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),

    /// XML spreadsheet markup is malformed.
    #[error("malformed XML spreadsheet: {0}")]
    Xml(String),

    /// Binary or zip workbook could not be decoded.
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    /// The requested worksheet does not exist.
    #[error("worksheet not found: {0}")]
    SheetNotFound(String),

    /// The workbook contains no worksheets.
    #[error("workbook has no worksheets")]
    NoSheets,
}

/// Errors related to invoice extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No candidate header row exists because the grid has no rows.
    #[error("grid is empty, no header row could be detected")]
    EmptyGrid,

    /// An explicit header row lies outside the grid.
    #[error("header row {row} is out of range (grid has {rows} rows)")]
    HeaderRowOutOfRange { row: usize, rows: usize },
}

/// Errors raised while filling the output template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template workbook is missing or unreadable.
    #[error("cannot open template {path}: {reason}")]
    Open { path: String, reason: String },

    /// Template has no worksheet with the configured name.
    #[error("template has no worksheet named '{0}'")]
    SheetNotFound(String),

    /// A cell could not be written.
    #[error("failed to write cell {cell}: {reason}")]
    Write { cell: String, reason: String },

    /// The populated workbook could not be saved.
    #[error("cannot save {path}: {reason}")]
    Save { path: String, reason: String },
}

/// Result type for the moadian library.
pub type Result<T> = std::result::Result<T, MoadianError>;
