//! Extract command - print the structured record of one invoice.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use moadian_core::invoice::{ExtractionResult, GridInvoiceParser, InvoiceExtractor};

use super::{ensure_parent_dir, load_config, SourceOptions};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Source invoice (XML spreadsheet, xls or xlsx)
    #[arg(required = true)]
    source: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    source_options: SourceOptions,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    args.source_options.apply(&mut config);

    if !args.source.is_file() {
        anyhow::bail!("Source file not found: {}", args.source.display());
    }

    let parser = GridInvoiceParser::from_config(&config);
    let result = parser.extract_file(&args.source).map_err(|e| {
        anyhow::anyhow!("{} stage failed for {}: {}", e.stage(), args.source.display(), e)
    })?;
    info!(
        "Extracted {} items in {}ms",
        result.record.items.len(),
        result.processing_time_ms
    );

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Text => format_text(&result)?,
    };

    if let Some(output_path) = &args.output {
        ensure_parent_dir(output_path)?;
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(result: &ExtractionResult) -> Result<String, std::fmt::Error> {
    let record = &result.record;
    let mut out = String::new();

    writeln!(out, "Source: {}", record.source)?;
    writeln!(out, "Sheet: {}", record.sheet)?;
    writeln!(out, "Header row: {}", record.header_row)?;

    writeln!(out)?;
    writeln!(out, "Columns:")?;
    for (col, key) in record.columns.iter() {
        writeln!(out, "  {}: {}", col, key)?;
    }

    writeln!(out)?;
    writeln!(out, "Metadata:")?;
    for (key, value) in record.metadata.iter() {
        writeln!(out, "  {}: {}", key, value)?;
    }

    writeln!(out)?;
    writeln!(out, "Items ({}):", record.items.len())?;
    for (i, item) in record.items.iter().enumerate() {
        let fields: Vec<String> = item
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        writeln!(out, "  {}. {}", i + 1, fields.join(", "))?;
    }

    if !record.totals.is_empty() {
        writeln!(out)?;
        writeln!(out, "Totals:")?;
        for (field, amount) in record.totals.iter() {
            writeln!(out, "  {}: {}", field, amount.normalize())?;
        }
    }

    if !result.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in &result.warnings {
            writeln!(out, "  - {}", warning)?;
        }
    }

    Ok(out)
}
