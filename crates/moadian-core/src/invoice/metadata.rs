//! Key/value metadata from the rows above the item table.
//!
//! Two passes run over the same rows. The generic pass pairs label-looking
//! cells with a neighbouring value. The structured pass applies exact label
//! patterns to whole-row text and wins on key collisions.

use tracing::{debug, trace};

use super::rules::{
    extract_buyer, header_field_extractors, normalize_digits, FieldExtractor, DIGIT_KEY,
    JOIN_CONTROLS, LABEL_KEYWORD, TRAILING_COLON,
};
use crate::grid::{Cell, Grid};
use crate::models::invoice::MetadataMap;

const NULL_VALUES: &[&str] = &["None", "nan"];

/// Extract metadata from every row above `header_row`.
pub fn extract_metadata(grid: &Grid, header_row: usize) -> MetadataMap {
    let rows: Vec<&[Cell]> = grid.rows().take(header_row).collect();
    if rows.is_empty() {
        return MetadataMap::new();
    }

    let mut meta = label_value_pairs(&rows);
    let structured = structured_fields(&rows);
    debug!(
        "Metadata: {} generic pair(s), {} structured field(s)",
        meta.len(),
        structured.len()
    );

    meta.merge_override(structured);
    meta
}

fn is_label(text: &str) -> bool {
    TRAILING_COLON.is_match(text) || LABEL_KEYWORD.is_match(text)
}

/// Label text without its trailing colon and with join controls folded.
fn label_key(text: &str) -> String {
    let stripped = TRAILING_COLON.replace(text, "");
    JOIN_CONTROLS.replace_all(&stripped, " ").trim().to_string()
}

/// Pair each label cell with the next non-blank cell in its row, or with
/// the nearest preceding one when it is not itself a colon label.
pub fn label_value_pairs(rows: &[&[Cell]]) -> MetadataMap {
    let mut meta = MetadataMap::new();

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .filter_map(Cell::display)
            .map(|t| t.into_owned())
            .collect();

        for (i, text) in cells.iter().enumerate() {
            if !is_label(text) {
                continue;
            }

            let value = cells.get(i + 1).or_else(|| {
                i.checked_sub(1)
                    .and_then(|p| cells.get(p))
                    .filter(|prev| !TRAILING_COLON.is_match(prev))
            });
            let Some(value) = value else {
                continue;
            };

            let key = label_key(text);
            if key.is_empty() {
                continue;
            }
            let value = if DIGIT_KEY.is_match(&key) {
                normalize_digits(value).into_owned()
            } else {
                value.clone()
            };

            let stored = meta.insert_unique(&key, value);
            trace!("Metadata pair '{}'", stored);
        }
    }

    meta.retain(|_, v| !v.is_empty() && !NULL_VALUES.contains(&v));
    meta
}

/// Digit-normalized text of a row's non-blank cells joined by spaces.
fn row_text(row: &[Cell]) -> String {
    let joined = row
        .iter()
        .filter_map(Cell::display)
        .collect::<Vec<_>>()
        .join(" ");
    normalize_digits(&joined).into_owned()
}

/// Labeled invoice fields and the buyer block.
pub fn structured_fields(rows: &[&[Cell]]) -> MetadataMap {
    let texts: Vec<String> = rows.iter().map(|r| row_text(r)).collect();
    let mut meta = MetadataMap::new();

    for extractor in header_field_extractors() {
        for text in &texts {
            if let Some(found) = extractor.extract(text) {
                meta.set(extractor.key(), found);
            }
        }
    }

    let buyer = extract_buyer(texts.iter().map(String::as_str));
    meta.merge_override(buyer.into_metadata());
    meta
}
