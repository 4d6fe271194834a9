//! Column label canonicalization.
//!
//! Rules are tried in order and the first match wins. Specific patterns come
//! before the general ones they overlap with: `مبلغ واحد` before `واحد`, and
//! an exact `کد` before any label merely containing it.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::grid::Cell;
use crate::models::invoice::{CanonicalField, ColumnMap, FieldName};

/// One canonicalization rule.
#[derive(Debug)]
pub struct LabelRule {
    pub pattern: Regex,
    pub field: CanonicalField,
}

impl LabelRule {
    fn new(pattern: &str, field: CanonicalField) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            field,
        }
    }
}

lazy_static! {
    pub static ref LABEL_RULES: Vec<LabelRule> = vec![
        LabelRule::new(r"شرح.*(کالا|خدمات)", CanonicalField::Description),
        LabelRule::new(r"مبلغ.?واحد", CanonicalField::UnitPrice),
        LabelRule::new(r"مبلغ.?کل", CanonicalField::TotalAmount),
        LabelRule::new(r"مقدار", CanonicalField::Quantity),
        LabelRule::new(r"واحد", CanonicalField::Unit),
        LabelRule::new(r"تخفیف", CanonicalField::DiscountAmount),
        LabelRule::new(r"مالیات|عوارض", CanonicalField::TaxAndDuties),
        LabelRule::new(r"ردیف", CanonicalField::RowNumber),
        LabelRule::new(r"^کد$", CanonicalField::ProductCode),
        LabelRule::new(r"کد", CanonicalField::ProductCodeAlt),
    ];
}

/// Map header text to a field. Unmatched text passes through trimmed;
/// blank text maps to nothing.
pub fn canonicalize(text: &str) -> Option<FieldName> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let field = LABEL_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map(|rule| FieldName::Canonical(rule.field))
        .unwrap_or_else(|| FieldName::Other(text.to_string()));
    Some(field)
}

/// True when `text` is exactly one of the canonical labels.
pub fn is_header_token(text: &str) -> bool {
    CanonicalField::from_label(text).is_some()
}

/// Build the column map for a header row.
pub fn build_column_map(header: &[Cell]) -> ColumnMap {
    let mut map = ColumnMap::new();

    for (column, cell) in header.iter().enumerate() {
        let Some(text) = cell.display() else {
            continue;
        };
        if let Some(field) = canonicalize(&text) {
            let key = map.insert(column, field);
            debug!("Column {} '{}' -> {}", column, text, key);
        }
    }

    map
}
