//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

/// Main configuration for the moadian pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoadianConfig {
    /// Source workbook loading.
    pub loader: LoaderConfig,

    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// Output template configuration.
    pub template: TemplateConfig,
}

/// Source workbook loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Worksheet to read. `None` reads the first sheet.
    pub sheet_name: Option<String>,
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Number of leading rows considered as header candidates.
    pub header_scan_limit: usize,

    /// Stop reading items at the first grand-total row.
    pub stop_on_total: bool,

    /// Rows with fewer non-blank cells are ignored.
    pub min_nonempty_cells: usize,

    /// Fixed 0-based header row, bypassing detection.
    pub header_row: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            header_scan_limit: 60,
            stop_on_total: true,
            min_nonempty_cells: 2,
            header_row: None,
        }
    }
}

/// Output template configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Worksheet receiving the rows.
    pub sheet_name: String,

    /// First data row (1-based, below the template's header).
    pub first_data_row: u32,

    /// Origin warehouse postal code used when the buyer's is unknown.
    pub origin_postal_code: Option<String>,

    /// Text written to the document description column.
    pub document_description: String,

    /// Value of the "other additions" column.
    pub other_additions: Decimal,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            sheet_name: "فروش به مصرف کننده".to_string(),
            first_data_row: 2,
            origin_postal_code: None,
            document_description: String::new(),
            other_additions: Decimal::ZERO,
        }
    }
}

impl MoadianConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MoadianConfig::default();
        assert_eq!(config.extraction.header_scan_limit, 60);
        assert!(config.extraction.stop_on_total);
        assert_eq!(config.extraction.min_nonempty_cells, 2);
        assert_eq!(config.template.first_data_row, 2);
        assert_eq!(config.template.origin_postal_code, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MoadianConfig =
            serde_json::from_str(r#"{"extraction": {"stop_on_total": false}}"#).unwrap();
        assert!(!config.extraction.stop_on_total);
        assert_eq!(config.extraction.header_scan_limit, 60);
        assert_eq!(config.template.sheet_name, "فروش به مصرف کننده");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = MoadianConfig::default();
        config.template.origin_postal_code = Some("1234567890".into());
        config.loader.sheet_name = Some("Sheet2".into());
        config.save(&path).unwrap();

        let loaded = MoadianConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
