//! Core library for Moadian tax invoice conversion.
//!
//! This crate provides:
//! - Grid loading from XML spreadsheet markup and xls/xlsx workbooks
//! - Header-row detection and Persian column label canonicalization
//! - Line item, totals and header metadata extraction
//! - Accounting import template population
//! - Batch extraction with per-file skip reporting

pub mod batch;
pub mod error;
pub mod grid;
pub mod invoice;
pub mod models;
pub mod template;

pub use batch::{discover_sources, run_batch, BatchOutcome, BatchReport, BatchResult};
pub use error::{ExtractionError, LoadError, MoadianError, Result, TemplateError};
pub use grid::{load_sheet, read_sheet, Cell, Grid, LoadedSheet, SourceFormat};
pub use invoice::{ExtractionResult, GridInvoiceParser, InvoiceExtractor, InvoiceParser};
pub use models::config::MoadianConfig;
pub use models::invoice::{
    CanonicalField, ColumnMap, FieldValue, InvoiceRecord, LineItem, MetadataMap, TotalsSummary,
};
pub use template::{Placement, PopulateSummary, TemplatePopulator};
