//! Batch processing command for a directory of invoice files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::Args;
use console::style;
use futures_util::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use moadian_core::batch::{discover_sources, BatchOutcome, BatchReport};
use moadian_core::invoice::{GridInvoiceParser, InvoiceExtractor};
use moadian_core::template::{Placement, TemplatePopulator};

use super::{ensure_parent_dir, load_config, SourceOptions};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing invoice files
    #[arg(required = true)]
    input_dir: PathBuf,

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

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Also write a per-file summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.source_options.apply(&mut config);
    if args.origin_postal_code.is_some() {
        config.template.origin_postal_code = args.origin_postal_code.clone();
    }

    if !args.input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.input_dir.display());
    }
    if !args.template.is_file() {
        anyhow::bail!("Template file not found: {}", args.template.display());
    }

    let files = discover_sources(&args.input_dir)?;
    if files.is_empty() {
        anyhow::bail!("No invoice files found in {}", args.input_dir.display());
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Each worker owns its grid and maps; `buffered` keeps input order.
    let parser = Arc::new(GridInvoiceParser::from_config(&config));
    let joined: Vec<_> = stream::iter(files)
        .map(|path| {
            let parser = Arc::clone(&parser);
            tokio::task::spawn_blocking(move || {
                let result = parser.extract_file(&path);
                BatchOutcome::from_extraction(path, result)
            })
        })
        .buffered(args.jobs.max(1))
        .inspect(|_| pb.inc(1))
        .collect()
        .await;

    let mut report = BatchReport::new();
    for outcome in joined {
        report.push(outcome?);
    }
    pb.finish_and_clear();

    for outcome in report.outcomes() {
        match (outcome.record(), outcome.skip_reason()) {
            (Some(record), _) => {
                println!(
                    "{} {} ({} items)",
                    style("✓").green(),
                    outcome.file_name(),
                    record.items.len()
                );
                for warning in outcome.warnings() {
                    debug!("{}: {}", outcome.file_name(), warning);
                }
            }
            (None, reason) => {
                println!(
                    "{} {} skipped: {}",
                    style("⚠").yellow(),
                    outcome.file_name(),
                    reason.unwrap_or("unknown error")
                );
            }
        }
    }

    if let Some(summary_path) = &args.summary {
        ensure_parent_dir(summary_path)?;
        write_summary(summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let extracted = report.extracted_count();
    let skipped = report.len() - extracted;

    if report.is_total_failure() {
        anyhow::bail!("No invoices could be extracted from {}", args.input_dir.display());
    }

    ensure_parent_dir(&args.output)?;
    let populator = TemplatePopulator::new(config.template.clone());
    let summary = populator.populate(
        &args.template,
        &args.output,
        report.records(),
        Placement::Append,
        Local::now(),
    )?;
    info!(
        "Appended rows {}..{}",
        summary.first_row,
        summary.first_row as usize + summary.rows_written
    );

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.len(),
        start.elapsed()
    );
    println!(
        "   {} extracted, {} skipped, {} rows written to {}",
        style(extracted).green(),
        style(skipped).yellow(),
        summary.rows_written,
        args.output.display()
    );

    Ok(())
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "items",
        "invoice_number",
        "invoice_date",
        "buyer_id",
        "error",
    ])?;

    for outcome in report.outcomes() {
        let filename = outcome.file_name();

        if let Some(record) = outcome.record() {
            wtr.write_record([
                filename.as_str(),
                "extracted",
                &record.items.len().to_string(),
                record.invoice_number().unwrap_or(""),
                record.invoice_date().unwrap_or(""),
                record.buyer_id().unwrap_or(""),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename.as_str(),
                "skipped",
                "",
                "",
                "",
                "",
                outcome.skip_reason().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
