//! Rule-based field extractors for Persian tax invoices.

pub mod buyer;
pub mod fields;
pub mod numerals;
pub mod patterns;

pub use buyer::{extract_buyer, BuyerInfo};
pub use fields::{header_field_extractors, LabeledFieldExtractor};
pub use numerals::{normalize_digits, parse_number};
pub use patterns::*;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}
