//! Reader for XML spreadsheet markup (the 2003 `urn:schemas-microsoft-com:office:spreadsheet` format).
//!
//! Government portals export invoices in this format with an `.xls`
//! extension. Rows and cells are positional; an `ss:Index` attribute skips
//! ahead and the gap is filled with blank cells (or blank rows).

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::{Cell, Grid, LoadedSheet, Result, SheetReader};
use crate::error::LoadError;

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// XML spreadsheet reader using quick-xml.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetMlReader;

impl SpreadsheetMlReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse every worksheet in the document, in order.
    pub fn read_all(&self, data: &[u8]) -> Result<Vec<LoadedSheet>> {
        let mut reader = Reader::from_reader(data);
        let mut buf = Vec::new();
        let mut state = ParseState::default();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                LoadError::Xml(format!("{} at byte {}", e, reader.buffer_position()))
            })?;

            match event {
                Event::Start(e) => state.open(&e, false),
                Event::Empty(e) => state.open(&e, true),
                Event::Text(t) if state.in_data => {
                    let text = t
                        .unescape()
                        .map_err(|e| LoadError::Xml(e.to_string()))?;
                    state.text.push_str(&text);
                }
                Event::CData(t) if state.in_data => {
                    state.text.push_str(&String::from_utf8_lossy(&t));
                }
                Event::End(e) => state.close(e.local_name().as_ref()),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        debug!("Parsed {} worksheet(s) from XML spreadsheet", state.sheets.len());
        Ok(state.sheets)
    }
}

impl SheetReader for SpreadsheetMlReader {
    fn read(&self, data: &[u8], sheet: Option<&str>) -> Result<LoadedSheet> {
        let mut sheets = self.read_all(data)?;

        match sheet {
            Some(name) => sheets
                .into_iter()
                .find(|s| s.name == name)
                .ok_or_else(|| LoadError::SheetNotFound(name.to_string())),
            None if sheets.is_empty() => Err(LoadError::NoSheets),
            None => Ok(sheets.swap_remove(0)),
        }
    }
}

/// Cursor through the Worksheet > Table > Row > Cell > Data nesting.
#[derive(Default)]
struct ParseState {
    sheets: Vec<LoadedSheet>,
    sheet_name: Option<String>,
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
    in_data: bool,
    numeric: bool,
    text: String,
}

impl ParseState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.local_name().as_ref() {
            b"Worksheet" => {
                self.sheet_name = Some(
                    attribute(e, b"Name").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
                );
                self.rows.clear();
                if empty {
                    self.close(b"Worksheet");
                }
            }
            b"Row" => {
                if let Some(index) = index_attribute(e) {
                    while self.rows.len() + 1 < index {
                        self.rows.push(Vec::new());
                    }
                }
                self.row.clear();
                if empty {
                    self.close(b"Row");
                }
            }
            b"Cell" => {
                if let Some(index) = index_attribute(e) {
                    while self.row.len() + 1 < index {
                        self.row.push(Cell::Empty);
                    }
                }
                self.text.clear();
                self.numeric = false;
                if empty {
                    self.close(b"Cell");
                }
            }
            b"Data" => {
                self.numeric = attribute(e, b"Type").as_deref() == Some("Number");
                self.in_data = !empty;
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"Data" => self.in_data = false,
            b"Cell" => {
                let cell = make_cell(std::mem::take(&mut self.text), self.numeric);
                self.row.push(cell);
            }
            b"Row" => {
                trace!("Row {} has {} cells", self.rows.len(), self.row.len());
                self.rows.push(std::mem::take(&mut self.row));
            }
            b"Worksheet" => {
                let name = self
                    .sheet_name
                    .take()
                    .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
                let grid = Grid::from_rows(std::mem::take(&mut self.rows));
                self.sheets.push(LoadedSheet { name, grid });
            }
            _ => {}
        }
    }
}

fn make_cell(text: String, numeric: bool) -> Cell {
    if text.is_empty() {
        return Cell::Empty;
    }
    if numeric {
        let trimmed = text.trim();
        let parsed = Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed));
        if let Ok(n) = parsed {
            return Cell::Number(n);
        }
    }
    Cell::Text(text)
}

/// Attribute value by local name, ignoring the `ss:` prefix.
fn attribute(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// 1-based `ss:Index` attribute.
fn index_attribute(e: &BytesStart<'_>) -> Option<usize> {
    attribute(e, b"Index").and_then(|v| v.trim().parse().ok())
}
