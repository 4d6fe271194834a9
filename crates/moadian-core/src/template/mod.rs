//! Filling the accounting import template.
//!
//! The template workbook is edited in place with edit-xlsx so its styles and
//! header survive; calamine is used to find where existing rows end.

mod row;

pub use row::{rows_for_record, DocumentFields, TemplateColumn, TemplateRow};

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Local};
use edit_xlsx::{RichText, Word, Workbook, Write};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

use crate::error::TemplateError;
use crate::models::config::TemplateConfig;
use crate::models::invoice::{FieldValue, InvoiceRecord};

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Where the first written row goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Start at the configured first data row, replacing what is there.
    Overwrite,
    /// Start at the first row whose A and B cells are both blank.
    Append,
}

/// Outcome of a populate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateSummary {
    /// 1-based row of the first written line.
    pub first_row: u32,
    pub rows_written: usize,
}

/// Writes invoice records into the template worksheet.
#[derive(Debug, Clone, Default)]
pub struct TemplatePopulator {
    config: TemplateConfig,
}

impl TemplatePopulator {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Write one row per line item of every record, in order, and save the
    /// result to `output`. The template file itself is not modified.
    pub fn populate<'a>(
        &self,
        template: &Path,
        output: &Path,
        records: impl IntoIterator<Item = &'a InvoiceRecord>,
        placement: Placement,
        now: DateTime<Local>,
    ) -> Result<PopulateSummary> {
        if !template.is_file() {
            return Err(TemplateError::Open {
                path: template.display().to_string(),
                reason: "file not found".to_string(),
            });
        }

        let first_row = match placement {
            Placement::Overwrite => self.config.first_data_row,
            Placement::Append => self.first_free_row(template)?,
        };
        debug!("Writing template rows from row {}", first_row);

        let mut workbook = Workbook::from_path(template).map_err(|e| TemplateError::Open {
            path: template.display().to_string(),
            reason: e.to_string(),
        })?;
        let worksheet = workbook
            .get_worksheet_mut_by_name(&self.config.sheet_name)
            .map_err(|_| TemplateError::SheetNotFound(self.config.sheet_name.clone()))?;

        let mut row_number = first_row;
        for record in records {
            for row in rows_for_record(record, &self.config, now) {
                for (column, value) in row.cells() {
                    let cell = column.cell_ref(row_number);
                    let written = match value {
                        FieldValue::Text(text) => worksheet.write_rich_string(&cell, &plain_text(text)),
                        FieldValue::Number(n) => worksheet.write(&cell, n.to_f64().unwrap_or_default()),
                    };
                    written.map_err(|e| TemplateError::Write {
                        cell: cell.clone(),
                        reason: e.to_string(),
                    })?;
                }
                row_number += 1;
            }
        }

        workbook.save_as(output).map_err(|e| TemplateError::Save {
            path: output.display().to_string(),
            reason: e.to_string(),
        })?;

        let summary = PopulateSummary {
            first_row,
            rows_written: (row_number - first_row) as usize,
        };
        info!(
            "Wrote {} row(s) to {} starting at row {}",
            summary.rows_written,
            output.display(),
            summary.first_row
        );
        Ok(summary)
    }

    /// First row at or below the configured first data row whose A and B
    /// cells are both blank.
    pub fn first_free_row(&self, template: &Path) -> Result<u32> {
        let mut workbook = open_workbook_auto(template).map_err(|e| TemplateError::Open {
            path: template.display().to_string(),
            reason: e.to_string(),
        })?;
        let range = workbook
            .worksheet_range(&self.config.sheet_name)
            .map_err(|_| TemplateError::SheetNotFound(self.config.sheet_name.clone()))?;

        let occupied = |row: u32, col: u32| {
            range
                .get_value((row, col))
                .is_some_and(|d| !matches!(d, Data::Empty))
        };

        let mut row = self.config.first_data_row.max(1);
        while occupied(row - 1, 0) || occupied(row - 1, 1) {
            row += 1;
        }
        Ok(row)
    }
}

/// A single unstyled run. Written as an inline string so identifiers such as
/// codes with leading zeros are not read back as numbers.
fn plain_text(text: &str) -> RichText {
    RichText {
        words: vec![Word {
            text: text.to_string(),
            font: None,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::models::invoice::{
        meta_keys, CanonicalField, ColumnKey, ColumnMap, LineItem, MetadataMap, TotalsSummary,
    };
    use calamine::{open_workbook, Xlsx};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    const SHEET: &str = "فروش به مصرف کننده";

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    fn write_template(path: &Path, existing_rows: u32) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET).unwrap();
        for (i, header) in ["تاریخ سند", "شماره صورتحساب", "کد/شناسه ملی خریدار"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, i as u16, *header).unwrap();
        }
        for r in 1..=existing_rows {
            sheet.write_string(r, 0, "1401/01/01").unwrap();
            sheet.write_number(r, 1, 5.0).unwrap();
        }
        workbook.save(path).unwrap();
    }

    fn record(serial: &str, quantities: &[i64]) -> InvoiceRecord {
        let mut metadata = MetadataMap::new();
        metadata.set(meta_keys::SERIAL_NUMBER, serial);
        metadata.set(meta_keys::ISSUE_DATE, "1402/05/01");

        let items = quantities
            .iter()
            .map(|q| {
                let mut item = LineItem::new();
                item.insert(
                    ColumnKey::first(CanonicalField::ProductCode),
                    FieldValue::Text("29001".into()),
                );
                item.insert(
                    ColumnKey::first(CanonicalField::Quantity),
                    FieldValue::Number(Decimal::from(*q)),
                );
                item
            })
            .collect();

        InvoiceRecord {
            source: format!("{}.xls", serial),
            sheet: "Sheet1".into(),
            header_row: 3,
            columns: ColumnMap::new(),
            metadata,
            items,
            totals: TotalsSummary::new(),
        }
    }

    fn read_cell(path: &Path, row: u32, col: u32) -> Data {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let range = workbook.worksheet_range(SHEET).unwrap();
        range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
    }

    #[test]
    fn test_overwrite_starts_at_first_data_row() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        let output = dir.path().join("out.xlsx");
        write_template(&template, 1);

        let summary = TemplatePopulator::default()
            .populate(&template, &output, &[record("1024", &[2, 3])], Placement::Overwrite, now())
            .unwrap();

        assert_eq!(summary, PopulateSummary { first_row: 2, rows_written: 2 });
        assert_eq!(read_cell(&output, 1, 0), Data::String("1402/05/01".into()));
        assert_eq!(read_cell(&output, 1, 1), Data::String("1024".into()));
        assert_eq!(read_cell(&output, 2, 7), Data::String("29001".into()));
        assert_eq!(read_cell(&output, 2, 8), Data::Float(3.0));
        // Unknown buyer ID is left blank.
        assert_eq!(read_cell(&output, 1, 2), Data::Empty);
        // Header survives.
        assert_eq!(read_cell(&output, 0, 0), Data::String("تاریخ سند".into()));
    }

    #[test]
    fn test_append_after_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        let output = dir.path().join("out.xlsx");
        write_template(&template, 2);

        let populator = TemplatePopulator::default();
        assert_eq!(populator.first_free_row(&template).unwrap(), 4);

        let records = [record("1", &[1]), record("2", &[4, 5])];
        let summary = populator
            .populate(&template, &output, &records, Placement::Append, now())
            .unwrap();

        assert_eq!(summary, PopulateSummary { first_row: 4, rows_written: 3 });
        assert_eq!(read_cell(&output, 1, 1), Data::Float(5.0));
        assert_eq!(read_cell(&output, 3, 1), Data::String("1".into()));
        assert_eq!(read_cell(&output, 4, 1), Data::String("2".into()));
        assert_eq!(read_cell(&output, 5, 8), Data::Float(5.0));
    }

    #[test]
    fn test_text_identifiers_keep_leading_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        let output = dir.path().join("out.xlsx");
        write_template(&template, 0);

        let mut invoice = record("00042", &[1]);
        invoice.metadata.set(meta_keys::BUYER_ID, "0012345678");
        invoice.items[0].insert(
            ColumnKey::first(CanonicalField::ProductCode),
            FieldValue::Text("007".into()),
        );

        TemplatePopulator::default()
            .populate(&template, &output, &[invoice], Placement::Overwrite, now())
            .unwrap();

        assert_eq!(read_cell(&output, 1, 1), Data::String("00042".into()));
        assert_eq!(read_cell(&output, 1, 2), Data::String("0012345678".into()));
        assert_eq!(read_cell(&output, 1, 7), Data::String("007".into()));
        assert_eq!(read_cell(&output, 1, 8), Data::Float(1.0));
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplatePopulator::default()
            .populate(
                &dir.path().join("missing.xlsx"),
                &dir.path().join("out.xlsx"),
                &[] as &[InvoiceRecord],
                Placement::Overwrite,
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, TemplateError::Open { .. }));
    }

    #[test]
    fn test_missing_worksheet() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        write_template(&template, 0);

        let populator = TemplatePopulator::new(TemplateConfig {
            sheet_name: "Other".into(),
            ..TemplateConfig::default()
        });
        let err = populator
            .populate(
                &template,
                &dir.path().join("out.xlsx"),
                &[] as &[InvoiceRecord],
                Placement::Overwrite,
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, TemplateError::SheetNotFound(name) if name == "Other"));

        let err = populator.first_free_row(&template).unwrap_err();
        assert!(matches!(err, TemplateError::SheetNotFound(_)));
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        write_template(&template, 0);

        let err = TemplatePopulator::default()
            .populate(
                &template,
                &dir.path().join("no/such/dir/out.xlsx"),
                &[record("1", &[1])],
                Placement::Overwrite,
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, TemplateError::Save { .. }));
    }
}
