//! Invoice data extracted from a spreadsheet export.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Well-known metadata keys.
pub mod meta_keys {
    /// Invoice issue date (`YYYY/MM/DD`).
    pub const ISSUE_DATE: &str = "تاریخ صدور فاکتور";
    /// Invoice creation date (`YYYY/MM/DD`).
    pub const CREATION_DATE: &str = "تاریخ ایجاد فاکتور";
    /// Principal invoice number.
    pub const PRINCIPAL_NUMBER: &str = "شماره فاکتور اصلی";
    /// Invoice serial number.
    pub const SERIAL_NUMBER: &str = "شماره سریال";
    /// Serial in the taxpayer's tax memory.
    pub const TAX_MEMORY_SERIAL: &str = "سریال فاکتور حافظه مالیاتی";
    pub const BUYER_NAME: &str = "نام خریدار";
    /// National or registration number of the buyer.
    pub const BUYER_ID: &str = "کد/شناسه ملی خریدار";
    pub const BUYER_PHONE: &str = "تلفن خریدار";
    pub const BUYER_POSTAL_CODE: &str = "کد پستی خریدار";
}

/// Closed vocabulary of line-item columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    RowNumber,
    ProductCode,
    ProductCodeAlt,
    Description,
    Quantity,
    Unit,
    UnitPrice,
    TotalAmount,
    DiscountAmount,
    TaxAndDuties,
}

impl CanonicalField {
    /// Every canonical field.
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::RowNumber,
        CanonicalField::ProductCode,
        CanonicalField::ProductCodeAlt,
        CanonicalField::Description,
        CanonicalField::Quantity,
        CanonicalField::Unit,
        CanonicalField::UnitPrice,
        CanonicalField::TotalAmount,
        CanonicalField::DiscountAmount,
        CanonicalField::TaxAndDuties,
    ];

    /// Label as printed in an invoice header.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::RowNumber => "ردیف",
            CanonicalField::ProductCode => "کد",
            CanonicalField::ProductCodeAlt => "کد۲",
            CanonicalField::Description => "شرح کالا یا خدمات",
            CanonicalField::Quantity => "مقدار",
            CanonicalField::Unit => "واحد",
            CanonicalField::UnitPrice => "مبلغ واحد",
            CanonicalField::TotalAmount => "مبلغ کل",
            CanonicalField::DiscountAmount => "مبلغ تخفیف",
            CanonicalField::TaxAndDuties => "جمع مالیات و عوارض",
        }
    }

    /// Identifier-style name.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::RowNumber => "row_number",
            CanonicalField::ProductCode => "product_code",
            CanonicalField::ProductCodeAlt => "product_code_alt",
            CanonicalField::Description => "description",
            CanonicalField::Quantity => "quantity",
            CanonicalField::Unit => "unit",
            CanonicalField::UnitPrice => "unit_price",
            CanonicalField::TotalAmount => "total_amount",
            CanonicalField::DiscountAmount => "discount_amount",
            CanonicalField::TaxAndDuties => "tax_and_duties",
        }
    }

    /// Whether cell values in this column are parsed as numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            CanonicalField::RowNumber
                | CanonicalField::Quantity
                | CanonicalField::UnitPrice
                | CanonicalField::TotalAmount
                | CanonicalField::DiscountAmount
                | CanonicalField::TaxAndDuties
        )
    }

    /// Look up a field by its exact canonical label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.label() == label)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CanonicalField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A column's field: canonical, or an unrecognised label kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldName {
    Canonical(CanonicalField),
    Other(String),
}

impl FieldName {
    pub fn as_canonical(&self) -> Option<CanonicalField> {
        match self {
            FieldName::Canonical(field) => Some(*field),
            FieldName::Other(_) => None,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::Canonical(field) => f.write_str(field.label()),
            FieldName::Other(label) => f.write_str(label),
        }
    }
}

impl From<CanonicalField> for FieldName {
    fn from(field: CanonicalField) -> Self {
        FieldName::Canonical(field)
    }
}

/// Unique key of a mapped column.
///
/// The first column carrying a field has occurrence 1. Later columns with the
/// same field are numbered 2, 3, ... and render as `مقدار2`, `مقدار3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub field: FieldName,
    pub occurrence: usize,
}

impl ColumnKey {
    /// First occurrence of a field.
    pub fn first(field: impl Into<FieldName>) -> Self {
        Self {
            field: field.into(),
            occurrence: 1,
        }
    }

    /// Canonical field of a first occurrence. Suffixed duplicates yield `None`.
    pub fn canonical(&self) -> Option<CanonicalField> {
        if self.occurrence == 1 {
            self.field.as_canonical()
        } else {
            None
        }
    }

    /// Numeric parsing applies to first occurrences of numeric fields only.
    pub fn is_numeric(&self) -> bool {
        self.canonical().is_some_and(|f| f.is_numeric())
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence > 1 {
            write!(f, "{}{}", self.field, self.occurrence)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

impl Serialize for ColumnKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Column index (0-based) to field mapping for one header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnMap(IndexMap<usize, ColumnKey>);

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a column, numbering the field if it was already used.
    ///
    /// The number is bumped further while the rendered key is taken, so a
    /// passthrough label such as `توضیحات2` never shares a key with a
    /// numbered duplicate.
    pub fn insert(&mut self, column: usize, field: FieldName) -> &ColumnKey {
        let taken: HashSet<String> = self.0.values().map(ToString::to_string).collect();
        let occurrence = 1 + self.0.values().filter(|k| k.field == field).count();
        let mut key = ColumnKey { field, occurrence };
        while taken.contains(&key.to_string()) {
            key.occurrence += 1;
        }
        self.0.insert(column, key);
        &self.0[&column]
    }

    pub fn get(&self, column: usize) -> Option<&ColumnKey> {
        self.0.get(&column)
    }

    /// Mapped columns in left-to-right order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ColumnKey)> {
        self.0.iter().map(|(c, k)| (*c, k))
    }

    /// Columns holding the first occurrence of a numeric field.
    pub fn numeric_columns(&self) -> impl Iterator<Item = (usize, CanonicalField)> + '_ {
        self.iter()
            .filter(|(_, k)| k.is_numeric())
            .filter_map(|(c, k)| k.canonical().map(|f| (c, f)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Value of one line-item field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(Decimal),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n.normalize()),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One product or service row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LineItem(IndexMap<ColumnKey, FieldValue>);

impl LineItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ColumnKey, value: FieldValue) {
        self.0.insert(key, value);
    }

    /// Value of the first occurrence of a canonical field.
    pub fn get(&self, field: CanonicalField) -> Option<&FieldValue> {
        self.0.get(&ColumnKey::first(field))
    }

    /// Value by rendered key, e.g. `مقدار2` or a passthrough label.
    pub fn get_by_label(&self, label: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(k, _)| k.to_string() == label)
            .map(|(_, v)| v)
    }

    /// Numeric value of a canonical field, if it parsed.
    pub fn number(&self, field: CanonicalField) -> Option<Decimal> {
        self.get(field).and_then(FieldValue::as_number)
    }

    /// True when any occurrence of any of `fields` is present.
    pub fn has_any(&self, fields: &[CanonicalField]) -> bool {
        self.0
            .keys()
            .filter_map(|k| k.field.as_canonical())
            .any(|f| fields.contains(&f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnKey, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Numbers read from the grand-total row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TotalsSummary(IndexMap<CanonicalField, Decimal>);

impl TotalsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a total. A later value for the same field replaces the earlier one.
    pub fn insert(&mut self, field: CanonicalField, value: Decimal) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: CanonicalField) -> Option<Decimal> {
        self.0.get(&field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Decimal)> + '_ {
        self.0.iter().map(|(f, v)| (*f, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Free-form key/value facts from the region above the item table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataMap(IndexMap<String, String>);

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under a unique key, suffixing `_2`, `_3`, ... when the key is taken.
    /// Returns the key actually used.
    pub fn insert_unique(&mut self, key: &str, value: impl Into<String>) -> String {
        let mut unique = key.to_string();
        let mut n = 2;
        while self.0.contains_key(&unique) {
            unique = format!("{}_{}", key, n);
            n += 1;
        }
        self.0.insert(unique.clone(), value.into());
        unique
    }

    /// Insert or replace.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge `other` into `self`; entries of `other` win on collision.
    pub fn merge_override(&mut self, other: MetadataMap) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A fully extracted invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    /// Source file path or identifier.
    pub source: String,

    /// Worksheet the invoice was read from.
    pub sheet: String,

    /// 0-based index of the item table header row.
    pub header_row: usize,

    pub columns: ColumnMap,

    pub metadata: MetadataMap,

    /// Line items in sheet order.
    pub items: Vec<LineItem>,

    pub totals: TotalsSummary,
}

impl InvoiceRecord {
    /// Issue date, falling back to the creation date.
    pub fn invoice_date(&self) -> Option<&str> {
        self.metadata
            .get(meta_keys::ISSUE_DATE)
            .or_else(|| self.metadata.get(meta_keys::CREATION_DATE))
    }

    /// Serial number, falling back to the principal invoice number.
    pub fn invoice_number(&self) -> Option<&str> {
        self.metadata
            .get(meta_keys::SERIAL_NUMBER)
            .or_else(|| self.metadata.get(meta_keys::PRINCIPAL_NUMBER))
    }

    pub fn buyer_id(&self) -> Option<&str> {
        self.metadata.get(meta_keys::BUYER_ID)
    }

    pub fn buyer_name(&self) -> Option<&str> {
        self.metadata.get(meta_keys::BUYER_NAME)
    }
}
