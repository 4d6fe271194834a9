//! Numeral normalization for Persian and Arabic-Indic digits.

use std::borrow::Cow;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    static ref PLAIN_NUMBER: Regex = Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?$").unwrap();
}

/// Arabic thousands separator (U+066C).
const ARABIC_THOUSANDS: char = '\u{066C}';

/// Map a single digit glyph to its ASCII form.
fn fold_digit(c: char) -> Option<char> {
    let offset = match c {
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

/// Convert Persian (U+06F0..) and Arabic-Indic (U+0660..) digits to ASCII.
///
/// Text without foreign digits is returned borrowed, so normalizing twice
/// costs nothing and yields the same string.
pub fn normalize_digits(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| fold_digit(c).is_some()) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(text.chars().map(|c| fold_digit(c).unwrap_or(c)).collect())
}

/// Parse numeric cell text such as `"۱۲,۵۰۰"` or `"-3.25"`.
///
/// Thousands separators (`,` and `٬`) are dropped. Anything else that is not
/// a plain signed decimal makes the parse fail.
pub fn parse_number(text: &str) -> Option<Decimal> {
    let normalized = normalize_digits(text);
    let cleaned: String = normalized
        .chars()
        .filter(|c| *c != ',' && *c != ARABIC_THOUSANDS)
        .collect();
    let cleaned = cleaned.trim();

    if !PLAIN_NUMBER.is_match(cleaned) {
        return None;
    }

    Decimal::from_str(cleaned).ok()
}
