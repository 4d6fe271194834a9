//! Common regex patterns for Persian tax invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Grand-total marker in the item table.
pub const GRAND_TOTAL_MARKER: &str = "جمع کل";

/// Punctuation cells ignored when checking for repeated header bands.
pub const FILLER_CELLS: &[&str] = &["-", "."];

/// Rows opening the buyer particulars block.
pub const BUYER_BLOCK_START: &[&str] = &[
    "مشخصات\u{200c} خريدار\u{200c}",
    "مشخصات\u{200c} خریدار\u{200c}",
    "مشخصات خریدار",
];

/// Rows closing the buyer particulars block.
pub const BUYER_BLOCK_END: &[&str] = &[
    "مشخصات کالا",
    "مشخصات\u{200c} فروشنده\u{200c}",
    "مشخصات فروشنده",
];

lazy_static! {
    // Item table header keywords
    pub static ref HEADER_KEYWORD: Regex = Regex::new(
        r"شرح|کالا|خدمات|مقدار|واحد|مبلغ|ردیف|کد"
    ).unwrap();

    // Metadata labels
    pub static ref TRAILING_COLON: Regex = Regex::new(r"[:：]\s*$").unwrap();

    pub static ref LABEL_KEYWORD: Regex = Regex::new(
        r"تلفن|نشانی|کد پستی|شماره|Email|WebSite|ثبت|ملی|اقتصادی|تاریخ|فاکتور|سریال|حافظه|خریدار|فروشنده"
    ).unwrap();

    pub static ref JOIN_CONTROLS: Regex = Regex::new(r"[\u{200c}\u{200d}]").unwrap();

    /// Keys whose values are identifiers written in digits.
    pub static ref DIGIT_KEY: Regex = Regex::new(
        r"تلفن|کد پستی|ثبت|ملی|اقتصادی"
    ).unwrap();

    // Labeled invoice header fields
    pub static ref ISSUE_DATE: Regex = Regex::new(
        r"تاریخ صدور فاکتور\s*[:：]\s*([0-9]{4}/[0-9]{2}/[0-9]{2})"
    ).unwrap();

    pub static ref CREATION_DATE: Regex = Regex::new(
        r"تاریخ ایجاد فاکتور\s*[:：]\s*([0-9]{4}/[0-9]{2}/[0-9]{2})"
    ).unwrap();

    pub static ref PRINCIPAL_NUMBER: Regex = Regex::new(
        r"شماره فاکتور اصلی\s*[:：]\s*([A-Z0-9]+)"
    ).unwrap();

    pub static ref SERIAL_NUMBER: Regex = Regex::new(
        r"شماره سریال\s*[:：]\s*([0-9]+)"
    ).unwrap();

    pub static ref TAX_MEMORY_SERIAL: Regex = Regex::new(
        r"سریال فاکتور حافظه مالیاتی\s*[:：]\s*([0-9]+)"
    ).unwrap();

    // Buyer particulars
    pub static ref BUYER_NAME: Regex = Regex::new(
        r"نام شخص حقیقی/حقوقی\s*[:：]\s*(\S+)"
    ).unwrap();

    pub static ref BUYER_ID: Regex = Regex::new(
        r"شماره ثبت/ملی\s*[:：]\s*([0-9]+)"
    ).unwrap();

    pub static ref BARE_ID: Regex = Regex::new(r"([0-9]{10,14})").unwrap();

    pub static ref BUYER_PHONE: Regex = Regex::new(
        r"تلفن[^:：]{0,20}[:：]\s*([0-9][0-9\-]*[0-9])"
    ).unwrap();

    pub static ref BUYER_POSTAL_CODE: Regex = Regex::new(
        r"کد پستی\s*[:：]\s*([0-9]{10})"
    ).unwrap();
}
