//! Item table header row detection.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::rules::HEADER_KEYWORD;
use crate::grid::{Cell, Grid};

/// Header labels are short; longer cells are banner text.
const SHORT_LABEL_CHARS: usize = 30;
const KEYWORD_WEIGHT: usize = 4;

/// Best header candidate found in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCandidate {
    /// 0-based row index.
    pub row: usize,
    pub score: usize,
}

/// Score a row as an item table header.
///
/// Sum of: non-blank cells, short cells, distinct case-folded texts, and four
/// times the number of cells containing a header keyword.
pub fn score_row(row: &[Cell]) -> usize {
    let texts: Vec<String> = row
        .iter()
        .filter_map(Cell::display)
        .map(|t| t.into_owned())
        .collect();

    let nonblank = texts.len();
    let short = texts
        .iter()
        .filter(|t| t.chars().count() <= SHORT_LABEL_CHARS)
        .count();
    let distinct = texts
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<HashSet<_>>()
        .len();
    let keywords = texts.iter().filter(|t| HEADER_KEYWORD.is_match(t)).count();

    nonblank + short + distinct + KEYWORD_WEIGHT * keywords
}

/// Find the highest scoring row among the first `scan_limit` rows.
///
/// Ties keep the earliest row. An empty grid has no candidate.
pub fn detect_header_row(grid: &Grid, scan_limit: usize) -> Option<HeaderCandidate> {
    let mut best: Option<HeaderCandidate> = None;

    for (row, cells) in grid.rows().take(scan_limit).enumerate() {
        let score = score_row(cells);
        trace!("Header candidate row {} scored {}", row, score);

        match best {
            Some(current) if score <= current.score => {}
            _ => best = Some(HeaderCandidate { row, score }),
        }
    }

    if let Some(candidate) = best {
        debug!(
            "Detected header row {} (score {})",
            candidate.row, candidate.score
        );
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn row(texts: &[&str]) -> Vec<Cell> {
        texts
            .iter()
            .map(|t| if t.is_empty() { Cell::Empty } else { Cell::text(*t) })
            .collect()
    }

    #[test]
    fn test_score_row() {
        // non-blank, short, distinct, then three keyword cells
        let cells = row(&["ردیف", "مقدار", "", "مقدار"]);
        assert_eq!(score_row(&cells), 3 + 3 + 2 + 4 * 3);

        let banner = vec![Cell::text("صورتحساب الکترونیکی فروش کالا و خدمات نوع اول")];
        assert_eq!(score_row(&banner), 1 + 0 + 1 + 4);

        assert_eq!(score_row(&[Cell::Number(Decimal::ONE), Cell::Empty]), 3);
    }

    #[test]
    fn test_detects_table_header_below_banner() {
        let grid = Grid::from_rows(vec![
            row(&["صورتحساب فروش کالا و خدمات", "", "", ""]),
            row(&["شماره سریال:", "123", "", ""]),
            row(&["ردیف", "کد", "شرح کالا یا خدمات", "مقدار", "مبلغ واحد"]),
            row(&["1", "100", "میز", "2", "1000"]),
        ]);

        let found = detect_header_row(&grid, 60).unwrap();
        assert_eq!(found.row, 2);
    }

    #[test]
    fn test_ties_keep_first_row() {
        let grid = Grid::from_rows(vec![row(&["a", "b"]), row(&["c", "d"])]);
        assert_eq!(detect_header_row(&grid, 60).unwrap().row, 0);
    }

    #[test]
    fn test_scan_limit() {
        let grid = Grid::from_rows(vec![
            row(&["x"]),
            row(&["ردیف", "مقدار", "واحد"]),
        ]);
        assert_eq!(detect_header_row(&grid, 1).unwrap().row, 0);
        assert_eq!(detect_header_row(&grid, 2).unwrap().row, 1);
    }

    #[test]
    fn test_empty_grid() {
        assert_eq!(detect_header_row(&Grid::default(), 60), None);
    }
}
