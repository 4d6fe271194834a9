//! Grid invoice parser combining header detection, labels, items and metadata.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use super::header::detect_header_row;
use super::items::LineItemBuilder;
use super::labels::build_column_map;
use super::metadata::extract_metadata;
use super::{InvoiceExtractor, Result};
use crate::error::ExtractionError;
use crate::grid::{load_sheet, LoadedSheet};
use crate::models::config::{ExtractionConfig, MoadianConfig};
use crate::models::invoice::InvoiceRecord;

/// Result of invoice extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Extracted invoice data.
    pub record: InvoiceRecord,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse an invoice from a loaded worksheet. `source` identifies the file.
    fn parse(&self, source: &str, sheet: &LoadedSheet) -> Result<ExtractionResult>;
}

/// Heuristic parser for invoice grids.
#[derive(Debug, Clone)]
pub struct GridInvoiceParser {
    /// Rows considered when detecting the header.
    scan_limit: usize,
    /// Stop reading items at the first grand total.
    stop_on_total: bool,
    /// Minimum non-blank cells for a body row.
    min_nonempty: usize,
    /// Fixed header row, bypassing detection.
    header_row: Option<usize>,
    /// Worksheet read by `extract_file`.
    sheet_name: Option<String>,
}

impl GridInvoiceParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self::from_extraction_config(&ExtractionConfig::default())
    }

    fn from_extraction_config(config: &ExtractionConfig) -> Self {
        Self {
            scan_limit: config.header_scan_limit,
            stop_on_total: config.stop_on_total,
            min_nonempty: config.min_nonempty_cells,
            header_row: config.header_row,
            sheet_name: None,
        }
    }

    /// Create a parser from the full configuration.
    pub fn from_config(config: &MoadianConfig) -> Self {
        Self::from_extraction_config(&config.extraction)
            .with_sheet_name(config.loader.sheet_name.clone())
    }

    /// Set the header scan window.
    pub fn with_scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = limit;
        self
    }

    pub fn with_stop_on_total(mut self, stop: bool) -> Self {
        self.stop_on_total = stop;
        self
    }

    pub fn with_min_nonempty(mut self, min: usize) -> Self {
        self.min_nonempty = min;
        self
    }

    /// Use a fixed 0-based header row.
    pub fn with_header_row(mut self, row: Option<usize>) -> Self {
        self.header_row = row;
        self
    }

    /// Worksheet to read from source files.
    pub fn with_sheet_name(mut self, name: Option<String>) -> Self {
        self.sheet_name = name;
        self
    }

    fn resolve_header_row(&self, sheet: &LoadedSheet) -> Result<usize> {
        let rows = sheet.grid.height();

        if let Some(row) = self.header_row {
            if row >= rows {
                return Err(ExtractionError::HeaderRowOutOfRange { row, rows });
            }
            debug!("Using header row {} from configuration", row);
            return Ok(row);
        }

        detect_header_row(&sheet.grid, self.scan_limit)
            .map(|candidate| candidate.row)
            .ok_or(ExtractionError::EmptyGrid)
    }
}

impl Default for GridInvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser for GridInvoiceParser {
    fn parse(&self, source: &str, sheet: &LoadedSheet) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!(
            "Parsing invoice from sheet '{}' ({} rows)",
            sheet.name,
            sheet.grid.height()
        );

        let header_row = self.resolve_header_row(sheet)?;
        let header = sheet.grid.row(header_row).unwrap_or_default();
        let columns = build_column_map(header);

        let table = LineItemBuilder::new()
            .with_stop_on_total(self.stop_on_total)
            .with_min_nonempty(self.min_nonempty)
            .build(&sheet.grid, header_row, &columns);

        let metadata = extract_metadata(&sheet.grid, header_row);

        let record = InvoiceRecord {
            source: source.to_string(),
            sheet: sheet.name.clone(),
            header_row,
            columns,
            metadata,
            items: table.items,
            totals: table.totals,
        };

        if record.items.is_empty() {
            warnings.push("Could not extract line items".to_string());
        }
        if record.invoice_date().is_none() {
            warnings.push("Could not extract invoice date".to_string());
        }
        if record.invoice_number().is_none() {
            warnings.push("Could not extract invoice or serial number".to_string());
        }
        if record.buyer_id().is_none() {
            warnings.push("Could not extract buyer ID".to_string());
        }
        if table.total_row.is_none() {
            warnings.push("Grand total row not found".to_string());
        }

        debug!(
            "Extracted {} item(s) and {} metadata field(s) from {}",
            record.items.len(),
            record.metadata.len(),
            source
        );

        Ok(ExtractionResult {
            record,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

impl InvoiceExtractor for GridInvoiceParser {
    fn extract_file(&self, path: &Path) -> crate::Result<ExtractionResult> {
        let sheet = load_sheet(path, self.sheet_name.as_deref())?;
        let result = self.parse(&path.display().to_string(), &sheet)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MoadianError;
    use crate::grid::{read_sheet, Cell, Grid};
    use crate::models::invoice::{meta_keys, CanonicalField, FieldValue};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn sheet(rows: &[&[&str]]) -> LoadedSheet {
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|t| if t.is_empty() { Cell::Empty } else { Cell::text(*t) })
                    .collect()
            })
            .collect();
        LoadedSheet {
            name: "Sheet1".to_string(),
            grid: Grid::from_rows(rows),
        }
    }

    fn sample_sheet() -> LoadedSheet {
        sheet(&[
            &["صورتحساب الکترونیکی فروش کالا و خدمات نوع اول", "", "", "", ""],
            &["شماره سریال:۱۰۲۴", "", "تاریخ صدور فاکتور:۱۴۰۲/۰۵/۰۱", "", ""],
            &["مشخصات خریدار", "", "", "", ""],
            &["نام شخص حقیقی/حقوقی: رضا", "", "شماره ثبت/ملی:۰۰۱۲۳۴۵۶۷۸", "", ""],
            &["مشخصات کالا", "", "", "", ""],
            &["ردیف", "کد", "شرح کالا یا خدمات", "مقدار", "مبلغ واحد"],
            &["۱", "29001", "میز تحریر", "۲", "۱٬۰۰۰"],
            &["۲", "29002", "صندلی", "۴", "۵۰۰"],
            &["جمع کل", "", "", "۶", "۴٬۰۰۰"],
        ])
    }

    #[test]
    fn test_parse_basic_invoice() {
        let result = GridInvoiceParser::new()
            .parse("sample.xls", &sample_sheet())
            .unwrap();
        let record = &result.record;

        assert_eq!(record.header_row, 5);
        assert_eq!(record.items.len(), 2);
        assert_eq!(
            record.items[0].get(CanonicalField::ProductCode),
            Some(&FieldValue::Text("29001".into()))
        );
        assert_eq!(record.items[1].number(CanonicalField::Quantity), Some(Decimal::from(4)));
        assert_eq!(record.totals.get(CanonicalField::UnitPrice), Some(Decimal::from(4000)));

        assert_eq!(record.metadata.get(meta_keys::SERIAL_NUMBER), Some("1024"));
        assert_eq!(record.metadata.get(meta_keys::ISSUE_DATE), Some("1402/05/01"));
        assert_eq!(record.buyer_name(), Some("رضا"));
        assert_eq!(record.buyer_id(), Some("0012345678"));
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_header_row_override() {
        let result = GridInvoiceParser::new()
            .with_header_row(Some(5))
            .parse("sample.xls", &sample_sheet())
            .unwrap();
        assert_eq!(result.record.header_row, 5);

        let err = GridInvoiceParser::new()
            .with_header_row(Some(40))
            .parse("sample.xls", &sample_sheet())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::HeaderRowOutOfRange { row: 40, rows: 9 }));
    }

    #[test]
    fn test_empty_grid_fails() {
        let empty = LoadedSheet {
            name: "Sheet1".into(),
            grid: Grid::default(),
        };
        let err = GridInvoiceParser::new().parse("empty.xls", &empty).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyGrid));
    }

    #[test]
    fn test_warnings_for_missing_metadata() {
        let bare = sheet(&[
            &["ردیف", "شرح کالا یا خدمات", "مقدار", "مبلغ واحد"],
            &["1", "Widget", "2", "1,000"],
        ]);
        let result = GridInvoiceParser::new().parse("bare.xls", &bare).unwrap();

        assert_eq!(result.record.items.len(), 1);
        assert!(result.record.metadata.is_empty());
        assert_eq!(result.warnings.len(), 4);
    }

    #[test]
    fn test_round_trip_scenario() {
        let grid = sheet(&[
            &["فاکتور", "", "", ""],
            &["ردیف", "شرح کالا یا خدمات", "مقدار", "مبلغ واحد"],
            &["1", "Widget", "2", "1,000"],
            &["جمع کل", "", "", "2,000"],
            &["", "", "", ""],
        ]);
        let result = GridInvoiceParser::new().parse("scenario", &grid).unwrap();
        let record = result.record;

        assert_eq!(record.header_row, 1);
        assert_eq!(record.items.len(), 1);
        let item = &record.items[0];
        assert_eq!(item.len(), 4);
        assert_eq!(item.number(CanonicalField::RowNumber), Some(Decimal::ONE));
        assert_eq!(item.get(CanonicalField::Description), Some(&FieldValue::Text("Widget".into())));
        assert_eq!(item.number(CanonicalField::Quantity), Some(Decimal::from(2)));
        assert_eq!(item.number(CanonicalField::UnitPrice), Some(Decimal::from(1000)));
        assert_eq!(record.totals.len(), 1);
        assert_eq!(record.totals.get(CanonicalField::UnitPrice), Some(Decimal::from(2000)));
    }

    #[test]
    fn test_extract_file_spreadsheetml() {
        let xml = r#"<?xml version="1.0"?>
<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet"
          xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
  <Worksheet ss:Name="Sheet1"><Table>
    <Row><Cell><Data ss:Type="String">شماره سریال:77</Data></Cell></Row>
    <Row>
      <Cell><Data ss:Type="String">ردیف</Data></Cell>
      <Cell><Data ss:Type="String">مقدار</Data></Cell>
      <Cell><Data ss:Type="String">مبلغ واحد</Data></Cell>
    </Row>
    <Row>
      <Cell><Data ss:Type="Number">1</Data></Cell>
      <Cell><Data ss:Type="Number">3</Data></Cell>
      <Cell ss:Index="3"><Data ss:Type="Number">250</Data></Cell>
    </Row>
  </Table></Worksheet>
</Workbook>"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.xls");
        std::fs::write(&path, xml).unwrap();

        let result = GridInvoiceParser::new().extract_file(&path).unwrap();
        assert_eq!(result.record.invoice_number(), Some("77"));
        assert_eq!(
            result.record.items[0].number(CanonicalField::UnitPrice),
            Some(Decimal::from(250))
        );

        let sheet = read_sheet(xml.as_bytes(), None).unwrap();
        assert_eq!(sheet.grid.height(), 3);
    }

    #[test]
    fn test_extract_file_reports_stage() {
        let err = GridInvoiceParser::new()
            .extract_file(Path::new("/nonexistent/invoice.xls"))
            .unwrap_err();
        assert!(matches!(err, MoadianError::Load(_)));
        assert_eq!(err.stage(), "load");
    }
}
