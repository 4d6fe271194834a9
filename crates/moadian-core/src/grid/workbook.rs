//! Zip-based and legacy binary workbooks read through calamine.

use std::fmt::Display;
use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls, Xlsx};
use rust_decimal::Decimal;
use tracing::debug;

use super::{Cell, Grid, LoadedSheet, Result, SheetReader, SourceFormat};
use crate::error::LoadError;

/// Workbook reader backed by calamine.
#[derive(Debug, Clone, Copy)]
pub struct WorkbookReader {
    format: SourceFormat,
}

impl WorkbookReader {
    /// Reader for xlsx/xlsm content.
    pub fn xlsx() -> Self {
        Self { format: SourceFormat::Xlsx }
    }

    /// Reader for BIFF xls content.
    pub fn xls() -> Self {
        Self { format: SourceFormat::Xls }
    }
}

impl SheetReader for WorkbookReader {
    fn read(&self, data: &[u8], sheet: Option<&str>) -> Result<LoadedSheet> {
        let cursor = Cursor::new(data.to_vec());
        match self.format {
            SourceFormat::Xls => {
                let workbook: Xls<_> = open(cursor)?;
                read_range(workbook, sheet)
            }
            _ => {
                let workbook: Xlsx<_> = open(cursor)?;
                read_range(workbook, sheet)
            }
        }
    }
}

/// In-memory workbook source.
type Source = Cursor<Vec<u8>>;

fn open<R>(cursor: Source) -> Result<R>
where
    R: Reader<Source>,
    R::Error: Display,
{
    R::new(cursor).map_err(|e| LoadError::Workbook(e.to_string()))
}

fn read_range<R>(mut workbook: R, sheet: Option<&str>) -> Result<LoadedSheet>
where
    R: Reader<Source>,
    R::Error: Display,
{
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(requested) => names
            .iter()
            .find(|n| n.as_str() == requested)
            .cloned()
            .ok_or_else(|| LoadError::SheetNotFound(requested.to_string()))?,
        None => names.first().cloned().ok_or(LoadError::NoSheets)?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| LoadError::Workbook(e.to_string()))?;

    let grid = range_to_grid(&range);
    debug!("Read worksheet '{}' with {} rows", name, grid.height());

    Ok(LoadedSheet { name, grid })
}

/// Convert a calamine range into a grid anchored at A1.
///
/// calamine ranges start at the first used cell, so leading rows and columns
/// are restored as blanks to keep indices aligned with the sheet.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    Grid::from_rows(rows)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(n) => Cell::Number(Decimal::from(*n)),
        Data::Float(f) => Decimal::try_from(*f)
            .map(Cell::Number)
            .unwrap_or_else(|_| Cell::Text(f.to_string())),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => Cell::Text(
            dt.as_datetime()
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sample_xlsx() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Invoice").unwrap();
        sheet.write_string(1, 1, "ردیف").unwrap();
        sheet.write_string(1, 2, "مقدار").unwrap();
        sheet.write_number(2, 1, 1.0).unwrap();
        sheet.write_number(2, 2, 2.5).unwrap();
        workbook.add_worksheet().set_name("Other").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_xlsx_keeps_sheet_coordinates() {
        let sheet = WorkbookReader::xlsx().read(&sample_xlsx(), None).unwrap();

        assert_eq!(sheet.name, "Invoice");
        assert_eq!(sheet.grid.height(), 3);
        assert!(sheet.grid.row(0).unwrap().iter().all(Cell::is_blank));

        let header = sheet.grid.row(1).unwrap();
        assert_eq!(header[0], Cell::Empty);
        assert_eq!(header[1], Cell::text("ردیف"));

        let item = sheet.grid.row(2).unwrap();
        assert_eq!(item[1], Cell::Number(Decimal::from(1)));
        assert_eq!(item[2], Cell::Number(Decimal::new(25, 1)));
    }

    #[test]
    fn test_read_xlsx_named_sheet_missing() {
        let err = WorkbookReader::xlsx()
            .read(&sample_xlsx(), Some("Nope"))
            .unwrap_err();
        assert!(matches!(err, LoadError::SheetNotFound(_)));
    }

    #[test]
    fn test_corrupt_zip_is_a_workbook_error() {
        let err = WorkbookReader::xlsx()
            .read(b"PK\x03\x04 truncated", None)
            .unwrap_err();
        assert!(matches!(err, LoadError::Workbook(_)));
    }
}
