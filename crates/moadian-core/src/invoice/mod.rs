//! Invoice extraction from spreadsheet grids.

pub mod header;
pub mod items;
pub mod labels;
pub mod metadata;
mod parser;
pub mod rules;

pub use header::{detect_header_row, HeaderCandidate};
pub use items::{ItemTable, LineItemBuilder, RowKind};
pub use labels::{build_column_map, canonicalize};
pub use metadata::extract_metadata;
pub use parser::{ExtractionResult, GridInvoiceParser, InvoiceParser};

use std::path::Path;

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for file-level invoice extraction.
pub trait InvoiceExtractor {
    /// Load a source file and extract its invoice.
    fn extract_file(&self, path: &Path) -> crate::Result<ExtractionResult>;
}
