//! Process command - convert a single invoice into the template.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use moadian_core::invoice::{GridInvoiceParser, InvoiceExtractor};
use moadian_core::template::{Placement, TemplatePopulator};
use moadian_core::MoadianError;

use super::{ensure_parent_dir, load_config, SourceOptions};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Source invoice (XML spreadsheet, xls or xlsx)
    #[arg(required = true)]
    source: PathBuf,

    /// Template workbook to fill
    #[arg(short, long)]
    template: PathBuf,

    /// Output workbook
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    source_options: SourceOptions,

    /// Postal code written when the buyer's is unknown
    #[arg(long)]
    origin_postal_code: Option<String>,
}

/// Report which stage failed and turn it into the command error.
fn stage_failure(pb: &ProgressBar, err: MoadianError) -> anyhow::Error {
    pb.finish_and_clear();
    eprintln!(
        "{} {} stage failed: {}",
        style("✗").red(),
        err.stage(),
        err
    );
    anyhow::anyhow!("Processing failed at the {} stage", err.stage())
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.source_options.apply(&mut config);
    if args.origin_postal_code.is_some() {
        config.template.origin_postal_code = args.origin_postal_code.clone();
    }

    if !args.source.is_file() {
        anyhow::bail!("Source file not found: {}", args.source.display());
    }
    if !args.template.is_file() {
        anyhow::bail!("Template file not found: {}", args.template.display());
    }

    info!("Processing file: {}", args.source.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Extracting invoice...");
    let parser = GridInvoiceParser::from_config(&config);
    let result = parser
        .extract_file(&args.source)
        .map_err(|e| stage_failure(&pb, e))?;

    pb.set_message("Filling template...");
    ensure_parent_dir(&args.output)?;
    let populator = TemplatePopulator::new(config.template.clone());
    let summary = populator
        .populate(
            &args.template,
            &args.output,
            [&result.record],
            Placement::Overwrite,
            Local::now(),
        )
        .map_err(|e| stage_failure(&pb, e.into()))?;

    pb.finish_and_clear();

    for warning in &result.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }

    println!(
        "{} Wrote {} item row(s) from {} to {}",
        style("✓").green(),
        summary.rows_written,
        args.source.display(),
        args.output.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
