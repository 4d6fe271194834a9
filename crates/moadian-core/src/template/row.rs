//! Mapping of an extracted invoice onto template columns.

use chrono::{DateTime, Local};
use rust_decimal::Decimal;

use crate::models::config::TemplateConfig;
use crate::models::invoice::{
    meta_keys, CanonicalField, ColumnKey, FieldName, FieldValue, InvoiceRecord, LineItem,
};

/// Fixed columns of the import template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateColumn {
    DocumentDate,
    DocumentNumber,
    BuyerId,
    BuyerName,
    BuyerPhone,
    OriginPostalCode,
    DocumentDescription,
    ItemCode,
    Quantity,
    UnitPrice,
    DiscountAmount,
    OtherAdditions,
    TaxAndDuties,
}

impl TemplateColumn {
    pub const ALL: [TemplateColumn; 13] = [
        TemplateColumn::DocumentDate,
        TemplateColumn::DocumentNumber,
        TemplateColumn::BuyerId,
        TemplateColumn::BuyerName,
        TemplateColumn::BuyerPhone,
        TemplateColumn::OriginPostalCode,
        TemplateColumn::DocumentDescription,
        TemplateColumn::ItemCode,
        TemplateColumn::Quantity,
        TemplateColumn::UnitPrice,
        TemplateColumn::DiscountAmount,
        TemplateColumn::OtherAdditions,
        TemplateColumn::TaxAndDuties,
    ];

    /// Spreadsheet column letter.
    pub fn letter(&self) -> &'static str {
        match self {
            TemplateColumn::DocumentDate => "A",
            TemplateColumn::DocumentNumber => "B",
            TemplateColumn::BuyerId => "C",
            TemplateColumn::BuyerName => "D",
            TemplateColumn::BuyerPhone => "E",
            TemplateColumn::OriginPostalCode => "F",
            TemplateColumn::DocumentDescription => "G",
            TemplateColumn::ItemCode => "H",
            TemplateColumn::Quantity => "I",
            TemplateColumn::UnitPrice => "J",
            TemplateColumn::DiscountAmount => "K",
            TemplateColumn::OtherAdditions => "L",
            TemplateColumn::TaxAndDuties => "M",
        }
    }

    /// 0-based column index.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or_default()
    }

    /// A1-style reference for a 1-based row.
    pub fn cell_ref(&self, row: u32) -> String {
        format!("{}{}", self.letter(), row)
    }
}

/// Values shared by every row of one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFields {
    pub date: FieldValue,
    pub number: FieldValue,
    pub buyer_id: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub postal_code: Option<String>,
}

impl DocumentFields {
    /// Resolve invoice-level values, falling back to `now` for the date and
    /// number.
    pub fn resolve(record: &InvoiceRecord, config: &TemplateConfig, now: DateTime<Local>) -> Self {
        let date = record
            .invoice_date()
            .map(|d| FieldValue::Text(d.to_string()))
            .unwrap_or_else(|| FieldValue::Text(now.format("%Y/%m/%d").to_string()));

        let number = record
            .invoice_number()
            .map(|n| FieldValue::Text(n.to_string()))
            .unwrap_or_else(|| FieldValue::Number(Decimal::from(now.timestamp() % 1_000_000)));

        let meta = &record.metadata;
        Self {
            date,
            number,
            buyer_id: record.buyer_id().map(str::to_string),
            buyer_name: record.buyer_name().map(str::to_string),
            buyer_phone: meta.get(meta_keys::BUYER_PHONE).map(str::to_string),
            postal_code: meta
                .get(meta_keys::BUYER_POSTAL_CODE)
                .map(str::to_string)
                .or_else(|| config.origin_postal_code.clone()),
        }
    }
}

/// Item code: the alternate code column, then a repeated code column, then
/// the plain code.
fn item_code(item: &LineItem) -> Option<FieldValue> {
    let repeated = ColumnKey {
        field: FieldName::Canonical(CanonicalField::ProductCode),
        occurrence: 2,
    };
    item.get(CanonicalField::ProductCodeAlt)
        .or_else(|| item.get_by_label(&repeated.to_string()))
        .or_else(|| item.get(CanonicalField::ProductCode))
        .cloned()
}

fn amount_or_zero(item: &LineItem, field: CanonicalField) -> FieldValue {
    item.get(field)
        .cloned()
        .unwrap_or(FieldValue::Number(Decimal::ZERO))
}

/// One output row. Only non-blank values are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateRow {
    cells: Vec<(TemplateColumn, FieldValue)>,
}

impl TemplateRow {
    /// Build the row for one line item.
    pub fn build(document: &DocumentFields, item: &LineItem, config: &TemplateConfig) -> Self {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);

        let values = [
            (TemplateColumn::DocumentDate, Some(document.date.clone())),
            (TemplateColumn::DocumentNumber, Some(document.number.clone())),
            (TemplateColumn::BuyerId, text(&document.buyer_id)),
            (TemplateColumn::BuyerName, text(&document.buyer_name)),
            (TemplateColumn::BuyerPhone, text(&document.buyer_phone)),
            (TemplateColumn::OriginPostalCode, text(&document.postal_code)),
            (
                TemplateColumn::DocumentDescription,
                Some(FieldValue::Text(config.document_description.clone())),
            ),
            (TemplateColumn::ItemCode, item_code(item)),
            (TemplateColumn::Quantity, Some(amount_or_zero(item, CanonicalField::Quantity))),
            (TemplateColumn::UnitPrice, Some(amount_or_zero(item, CanonicalField::UnitPrice))),
            (
                TemplateColumn::DiscountAmount,
                Some(amount_or_zero(item, CanonicalField::DiscountAmount)),
            ),
            (
                TemplateColumn::OtherAdditions,
                Some(FieldValue::Number(config.other_additions)),
            ),
            (
                TemplateColumn::TaxAndDuties,
                Some(amount_or_zero(item, CanonicalField::TaxAndDuties)),
            ),
        ];

        let cells = values
            .into_iter()
            .filter_map(|(column, value)| value.map(|v| (column, v)))
            .filter(|(_, value)| !matches!(value, FieldValue::Text(s) if s.trim().is_empty()))
            .collect();
        Self { cells }
    }

    pub fn get(&self, column: TemplateColumn) -> Option<&FieldValue> {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn cells(&self) -> impl Iterator<Item = (TemplateColumn, &FieldValue)> {
        self.cells.iter().map(|(c, v)| (*c, v))
    }
}

/// Rows for every line item of an invoice, in item order.
pub fn rows_for_record(
    record: &InvoiceRecord,
    config: &TemplateConfig,
    now: DateTime<Local>,
) -> Vec<TemplateRow> {
    let document = DocumentFields::resolve(record, config, now);
    record
        .items
        .iter()
        .map(|item| TemplateRow::build(&document, item, config))
        .collect()
}
