//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod process;

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use moadian_core::models::config::MoadianConfig;

/// Worksheet and header overrides shared by the extracting commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceOptions {
    /// Worksheet to read from each source file (default: first sheet)
    #[arg(long)]
    pub sheet_name: Option<String>,

    /// Fixed 0-based header row, bypassing detection
    #[arg(long)]
    pub header_row: Option<usize>,
}

impl SourceOptions {
    pub fn apply(&self, config: &mut MoadianConfig) {
        if let Some(name) = &self.sheet_name {
            config.loader.sheet_name = Some(name.clone());
        }
        if self.header_row.is_some() {
            config.extraction.header_row = self.header_row;
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moadian")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<MoadianConfig> {
    if let Some(path) = config_path {
        return MoadianConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e));
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        debug!("Using config file {}", default_path.display());
        return MoadianConfig::from_file(&default_path).map_err(|e| {
            anyhow::anyhow!("Failed to read config {}: {}", default_path.display(), e)
        });
    }

    Ok(MoadianConfig::default())
}

/// Create the parent directory of an output file.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
