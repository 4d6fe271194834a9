//! Buyer identity from the buyer particulars block.
//!
//! The block starts after a "buyer particulars" title row and ends with the
//! next goods or seller particulars title, which is still searched since
//! exports often put the last buyer cells on that row. Labeled fields take
//! the last value seen; the bare-digit fallback keeps the first.

use tracing::trace;

use super::patterns::{
    BARE_ID, BUYER_BLOCK_END, BUYER_BLOCK_START, BUYER_ID, BUYER_NAME, BUYER_PHONE,
    BUYER_POSTAL_CODE,
};
use crate::models::invoice::{meta_keys, MetadataMap};

/// Buyer fields found in one invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyerInfo {
    pub name: Option<String>,
    /// Labeled national/registration number.
    pub labeled_id: Option<String>,
    /// First bare 10-14 digit run in the block.
    pub bare_id: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
}

impl BuyerInfo {
    /// Labeled ID, else the bare digit run.
    pub fn id(&self) -> Option<&str> {
        self.labeled_id.as_deref().or(self.bare_id.as_deref())
    }

    /// Entries for the metadata map.
    pub fn into_metadata(self) -> MetadataMap {
        let mut meta = MetadataMap::new();
        if let Some(name) = &self.name {
            meta.set(meta_keys::BUYER_NAME, name.as_str());
        }
        if let Some(id) = self.id() {
            meta.set(meta_keys::BUYER_ID, id);
        }
        if let Some(phone) = self.phone {
            meta.set(meta_keys::BUYER_PHONE, phone);
        }
        if let Some(postal) = self.postal_code {
            meta.set(meta_keys::BUYER_POSTAL_CODE, postal);
        }
        meta
    }
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

fn first_capture(re: &regex::Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Scan digit-normalized row texts for the buyer block.
pub fn extract_buyer<'a>(rows: impl IntoIterator<Item = &'a str>) -> BuyerInfo {
    let mut info = BuyerInfo::default();
    let mut in_block = false;

    for text in rows {
        if !in_block {
            in_block = contains_any(text, BUYER_BLOCK_START);
            continue;
        }
        trace!("Buyer block row: {}", text);

        if let Some(name) = first_capture(&BUYER_NAME, text) {
            info.name = Some(name);
        }
        if let Some(id) = first_capture(&BUYER_ID, text) {
            info.labeled_id = Some(id);
        }
        if info.bare_id.is_none() {
            info.bare_id = first_capture(&BARE_ID, text);
        }
        if let Some(phone) = first_capture(&BUYER_PHONE, text) {
            info.phone = Some(phone);
        }
        if let Some(postal) = first_capture(&BUYER_POSTAL_CODE, text) {
            info.postal_code = Some(postal);
        }

        if contains_any(text, BUYER_BLOCK_END) {
            break;
        }
    }

    info
}
