//! Spreadsheet loading into a plain cell grid.

mod spreadsheetml;
mod workbook;

pub use spreadsheetml::SpreadsheetMlReader;
pub use workbook::WorkbookReader;

use std::borrow::Cow;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::LoadError;

/// Result type for grid loading.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Text values that exporters write for missing cells.
const NULL_PLACEHOLDERS: &[&str] = &["None", "nan"];

/// A single spreadsheet cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// No value.
    #[default]
    Empty,
    /// Text content, kept verbatim.
    Text(String),
    /// Numeric content.
    Number(Decimal),
}

impl Cell {
    /// Build a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// True for empty cells, whitespace-only text and null placeholders.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => {
                let s = s.trim();
                s.is_empty() || NULL_PLACEHOLDERS.contains(&s)
            }
            Cell::Number(_) => false,
        }
    }

    /// Trimmed text of a text cell. Numbers and blanks yield `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(_) if self.is_blank() => None,
            Cell::Text(s) => Some(s.trim()),
            _ => None,
        }
    }

    /// Trimmed display form of any non-blank cell.
    pub fn display(&self) -> Option<Cow<'_, str>> {
        if self.is_blank() {
            return None;
        }
        match self {
            Cell::Text(s) => Some(Cow::Borrowed(s.trim())),
            Cell::Number(n) => Some(Cow::Owned(n.normalize().to_string())),
            Cell::Empty => None,
        }
    }
}

/// Rectangular, read-only view of one worksheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    /// Build a grid, padding ragged rows with empty cells.
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows, width }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one row.
    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// All rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// A worksheet read from a source file.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    /// Worksheet name.
    pub name: String,
    /// Cell contents.
    pub grid: Grid,
}

/// Detected container format of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// XML spreadsheet markup (often saved with an `.xls` extension).
    SpreadsheetMl,
    /// Zip-based workbook (xlsx, xlsm).
    Xlsx,
    /// Legacy binary workbook (BIFF xls).
    Xls,
}

impl SourceFormat {
    /// Sniff the format from file content.
    pub fn detect(data: &[u8]) -> Option<Self> {
        const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
        const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
        const SPREADSHEETML_NS: &str = "urn:schemas-microsoft-com:office:spreadsheet";

        if data.starts_with(ZIP_MAGIC) {
            return Some(SourceFormat::Xlsx);
        }
        if data.starts_with(OLE_MAGIC) {
            return Some(SourceFormat::Xls);
        }
        if String::from_utf8_lossy(data).contains(SPREADSHEETML_NS) {
            return Some(SourceFormat::SpreadsheetMl);
        }
        None
    }
}

/// Trait for source readers.
pub trait SheetReader {
    /// Read one worksheet from raw file content. `None` selects the first sheet.
    fn read(&self, data: &[u8], sheet: Option<&str>) -> Result<LoadedSheet>;
}

/// Read a worksheet from in-memory file content, detecting the format.
pub fn read_sheet(data: &[u8], sheet: Option<&str>) -> Result<LoadedSheet> {
    let format = SourceFormat::detect(data).ok_or_else(|| {
        LoadError::UnsupportedFormat("content is not a recognised spreadsheet".to_string())
    })?;
    debug!("Detected source format {:?}", format);

    match format {
        SourceFormat::SpreadsheetMl => SpreadsheetMlReader::new().read(data, sheet),
        SourceFormat::Xlsx => WorkbookReader::xlsx().read(data, sheet),
        SourceFormat::Xls => WorkbookReader::xls().read(data, sheet),
    }
}

/// Load a worksheet from a file on disk.
pub fn load_sheet(path: &Path, sheet: Option<&str>) -> Result<LoadedSheet> {
    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let loaded = read_sheet(&data, sheet)?;
    debug!(
        "Loaded sheet '{}' from {} ({} rows x {} cols)",
        loaded.name,
        path.display(),
        loaded.grid.height(),
        loaded.grid.width()
    );
    Ok(loaded)
}
