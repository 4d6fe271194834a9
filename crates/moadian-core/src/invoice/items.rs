//! Line items and totals from the rows below the header.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::labels::is_header_token;
use super::rules::{parse_number, FILLER_CELLS, GRAND_TOTAL_MARKER};
use crate::grid::{Cell, Grid};
use crate::models::invoice::{CanonicalField, ColumnMap, FieldValue, LineItem, TotalsSummary};

/// An accepted item must carry at least one of these.
const IDENTIFYING_FIELDS: &[CanonicalField] = &[
    CanonicalField::ProductCode,
    CanonicalField::ProductCodeAlt,
    CanonicalField::Quantity,
    CanonicalField::UnitPrice,
];

/// Classification of one body row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    /// Grand-total row with the numbers it carried.
    Total(TotalsSummary),
    /// A repeated band of header labels.
    HeaderBand,
    /// Lone tax-and-duties label separating sections.
    SectionDivider,
    Item(LineItem),
    /// Row without identifying fields.
    Noise,
}

/// Items and totals of one invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemTable {
    pub items: Vec<LineItem>,
    pub totals: TotalsSummary,
    /// Row index of the last grand-total row seen.
    pub total_row: Option<usize>,
}

/// Walks body rows and builds line items.
#[derive(Debug, Clone)]
pub struct LineItemBuilder {
    stop_on_total: bool,
    min_nonempty: usize,
}

impl LineItemBuilder {
    pub fn new() -> Self {
        Self {
            stop_on_total: true,
            min_nonempty: 2,
        }
    }

    /// Stop at the first grand-total row.
    pub fn with_stop_on_total(mut self, stop: bool) -> Self {
        self.stop_on_total = stop;
        self
    }

    /// Minimum non-blank cells for a row to be considered at all.
    pub fn with_min_nonempty(mut self, min: usize) -> Self {
        self.min_nonempty = min;
        self
    }

    /// Build the item table from rows below `header_row`.
    pub fn build(&self, grid: &Grid, header_row: usize, columns: &ColumnMap) -> ItemTable {
        let mut table = ItemTable::default();

        let body = grid
            .rows()
            .enumerate()
            .skip(header_row + 1)
            .filter(|(_, row)| nonblank_count(row) >= self.min_nonempty);

        for (index, row) in body {
            match self.classify(row, columns) {
                RowKind::Total(totals) => {
                    debug!("Grand total at row {}: {} field(s)", index, totals.len());
                    for (field, value) in totals.iter() {
                        table.totals.insert(field, value);
                    }
                    table.total_row = Some(index);
                    if self.stop_on_total {
                        break;
                    }
                }
                RowKind::Item(item) => table.items.push(item),
                other => trace!("Skipping row {} ({:?})", index, other),
            }
        }

        debug!(
            "Built {} item(s), totals {}",
            table.items.len(),
            if table.total_row.is_some() { "found" } else { "absent" }
        );
        table
    }

    /// Classify a single body row.
    pub fn classify(&self, row: &[Cell], columns: &ColumnMap) -> RowKind {
        if row
            .iter()
            .any(|c| c.as_text() == Some(GRAND_TOTAL_MARKER))
        {
            return RowKind::Total(read_totals(row, columns));
        }

        let texts: Vec<String> = row
            .iter()
            .filter_map(Cell::display)
            .filter(|t| !FILLER_CELLS.contains(&&**t))
            .map(|t| t.into_owned())
            .collect();

        // The tax label is itself a header token, so test for it first.
        if texts.len() == 1 && texts[0] == CanonicalField::TaxAndDuties.label() {
            return RowKind::SectionDivider;
        }
        if !texts.is_empty() && texts.iter().all(|t| is_header_token(t)) {
            return RowKind::HeaderBand;
        }

        let item = read_item(row, columns);
        if item.is_empty() || !item.has_any(IDENTIFYING_FIELDS) {
            return RowKind::Noise;
        }
        RowKind::Item(item)
    }
}

impl Default for LineItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn nonblank_count(row: &[Cell]) -> usize {
    row.iter().filter(|c| !c.is_blank()).count()
}

fn cell_number(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(t) => parse_number(t),
        Cell::Empty => None,
    }
}

fn read_totals(row: &[Cell], columns: &ColumnMap) -> TotalsSummary {
    let mut totals = TotalsSummary::new();
    for (column, field) in columns.numeric_columns() {
        if let Some(value) = row.get(column).and_then(cell_number) {
            totals.insert(field, value);
        }
    }
    totals
}

fn read_item(row: &[Cell], columns: &ColumnMap) -> LineItem {
    let mut item = LineItem::new();

    for (column, key) in columns.iter() {
        let Some(cell) = row.get(column) else {
            continue;
        };
        if cell.is_blank() {
            continue;
        }

        let value = match cell {
            Cell::Number(n) if key.is_numeric() => FieldValue::Number(*n),
            Cell::Number(n) => FieldValue::Text(n.normalize().to_string()),
            Cell::Text(raw) => {
                let text = raw.trim();
                if is_header_token(text) {
                    continue;
                }
                match parse_number(text) {
                    Some(n) if key.is_numeric() => FieldValue::Number(n),
                    _ => FieldValue::Text(text.to_string()),
                }
            }
            Cell::Empty => continue,
        };
        item.insert(key.clone(), value);
    }

    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::labels::build_column_map;
    use pretty_assertions::assert_eq;

    fn row(texts: &[&str]) -> Vec<Cell> {
        texts
            .iter()
            .map(|t| if t.is_empty() { Cell::Empty } else { Cell::text(*t) })
            .collect()
    }

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn sample_grid(extra: Vec<Vec<Cell>>) -> (Grid, ColumnMap) {
        let header = row(&["ردیف", "شرح کالا یا خدمات", "مقدار", "مبلغ واحد"]);
        let columns = build_column_map(&header);
        let mut rows = vec![row(&["فاکتور فروش", "", "", ""]), header];
        rows.extend(extra);
        (Grid::from_rows(rows), columns)
    }

    #[test]
    fn test_single_item_and_totals() {
        let (grid, columns) = sample_grid(vec![
            row(&["1", "Widget", "2", "1,000"]),
            row(&["جمع کل", "", "", "2,000"]),
            row(&["2", "Ignored", "1", "5"]),
        ]);

        let table = LineItemBuilder::new().build(&grid, 1, &columns);

        assert_eq!(table.items.len(), 1);
        let item = &table.items[0];
        assert_eq!(item.get(CanonicalField::RowNumber), Some(&FieldValue::Number(dec(1))));
        assert_eq!(
            item.get(CanonicalField::Description),
            Some(&FieldValue::Text("Widget".into()))
        );
        assert_eq!(item.number(CanonicalField::Quantity), Some(dec(2)));
        assert_eq!(item.number(CanonicalField::UnitPrice), Some(dec(1000)));

        assert_eq!(table.totals.fields().collect::<Vec<_>>(), vec![CanonicalField::UnitPrice]);
        assert_eq!(table.totals.get(CanonicalField::UnitPrice), Some(dec(2000)));
        assert_eq!(table.total_row, Some(3));
    }

    #[test]
    fn test_continue_past_total() {
        let (grid, columns) = sample_grid(vec![
            row(&["جمع کل", "", "3", "2,000"]),
            row(&["2", "Gadget", "1", "5"]),
        ]);

        let table = LineItemBuilder::new()
            .with_stop_on_total(false)
            .build(&grid, 1, &columns);

        assert_eq!(table.items.len(), 1);
        assert_eq!(table.totals.get(CanonicalField::Quantity), Some(dec(3)));
    }

    #[test]
    fn test_totals_only_hold_numeric_columns() {
        let (_, columns) = sample_grid(vec![]);
        let kind = LineItemBuilder::new().classify(&row(&["جمع کل", "همه", "4", "8"]), &columns);

        let RowKind::Total(totals) = kind else {
            panic!("expected a total row");
        };
        for field in totals.fields() {
            assert!(field.is_numeric());
        }
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn test_header_band_discarded() {
        let (grid, columns) = sample_grid(vec![row(&["ردیف", "-", "مقدار", "مبلغ واحد"])]);
        let builder = LineItemBuilder::new();

        assert_eq!(
            builder.classify(grid.row(2).unwrap(), &columns),
            RowKind::HeaderBand
        );
        assert!(builder.build(&grid, 1, &columns).items.is_empty());
    }

    #[test]
    fn test_description_only_row_is_noise() {
        let (grid, columns) = sample_grid(vec![row(&["", "فقط شرح", "", ""]), row(&["x", "شرح", "", ""])]);

        let builder = LineItemBuilder::new().with_min_nonempty(1);
        assert_eq!(builder.classify(grid.row(2).unwrap(), &columns), RowKind::Noise);
        assert!(builder.build(&grid, 1, &columns).items.is_empty());
    }

    #[test]
    fn test_sparse_rows_filtered() {
        let (grid, columns) = sample_grid(vec![row(&["", "", "5", ""])]);
        assert!(LineItemBuilder::new().build(&grid, 1, &columns).items.is_empty());

        let table = LineItemBuilder::new().with_min_nonempty(1).build(&grid, 1, &columns);
        assert_eq!(table.items.len(), 1);
    }

    #[test]
    fn test_echoed_header_values_skipped() {
        let (_, columns) = sample_grid(vec![]);
        let kind = LineItemBuilder::new().classify(&row(&["1", "مقدار", "3", "abc"]), &columns);

        let RowKind::Item(item) = kind else {
            panic!("expected an item");
        };
        assert_eq!(item.get(CanonicalField::Description), None);
        assert_eq!(item.get(CanonicalField::UnitPrice), Some(&FieldValue::Text("abc".into())));
    }

    #[test]
    fn test_items_keep_sheet_order() {
        let (grid, columns) = sample_grid(vec![
            row(&["1", "a", "1", "10"]),
            row(&["", "", "", ""]),
            row(&["2", "b", "2", "20"]),
            row(&["3", "c", "3", "30"]),
        ]);

        let table = LineItemBuilder::new().build(&grid, 1, &columns);
        let order: Vec<_> = table
            .items
            .iter()
            .filter_map(|i| i.number(CanonicalField::RowNumber))
            .collect();
        assert_eq!(order, vec![dec(1), dec(2), dec(3)]);
        assert_eq!(table.total_row, None);
    }

    #[test]
    fn test_persian_digits_in_numeric_columns() {
        let (_, columns) = sample_grid(vec![]);
        let kind = LineItemBuilder::new().classify(&row(&["۱", "میز", "۲", "۱۲٬۵۰۰"]), &columns);

        let RowKind::Item(item) = kind else {
            panic!("expected an item");
        };
        assert_eq!(item.number(CanonicalField::UnitPrice), Some(dec(12500)));
    }

    #[test]
    fn test_lone_tax_label_is_section_divider() {
        let (grid, columns) = sample_grid(vec![
            row(&["", "جمع مالیات و عوارض", "", ""]),
            row(&["1", "Widget", "2", "10"]),
        ]);
        let builder = LineItemBuilder::new().with_min_nonempty(1);

        assert_eq!(
            builder.classify(grid.row(2).unwrap(), &columns),
            RowKind::SectionDivider
        );
        assert_eq!(builder.build(&grid, 1, &columns).items.len(), 1);
    }

    #[test]
    fn test_workbook_numbers_in_text_columns_stay_text() {
        let columns = build_column_map(&row(&["ردیف", "کد کالا", "مقدار"]));
        let cells = vec![
            Cell::Number(dec(1)),
            Cell::Number(dec(29001)),
            Cell::Number(Decimal::new(250, 2)),
        ];

        let RowKind::Item(item) = LineItemBuilder::new().classify(&cells, &columns) else {
            panic!("expected an item");
        };
        assert_eq!(
            item.get(CanonicalField::ProductCodeAlt),
            Some(&FieldValue::Text("29001".into()))
        );
        assert_eq!(item.number(CanonicalField::Quantity), Some(Decimal::new(25, 1)));
        assert_eq!(item.number(CanonicalField::RowNumber), Some(dec(1)));
    }
}
