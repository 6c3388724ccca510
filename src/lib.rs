//! dupefind - Staged Duplicate File Finder
//!
//! Finds byte-identical files under a directory. Candidates are narrowed in
//! stages, cheapest first: file size, the first and last bytes of each file,
//! a full content hash on a bounded worker pool, and finally a byte-for-byte
//! comparison that confirms every reported set.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, ReportFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, DuplicateReport, ScanSummary};
use crate::error::ExitCode;
use crate::output::{CsvOutput, TreeOutput};
use crate::progress::Progress;

/// Run the application for parsed command-line arguments.
///
/// Returns the exit code for a completed run: [`ExitCode::Success`] when
/// duplicates were found, [`ExitCode::NoDuplicates`] when none were, and
/// [`ExitCode::PartialSuccess`] when some files had to be excluded.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable scan root, an
/// entry the scanner may not skip, an interrupted scan
/// ([`FinderError::Interrupted`](duplicates::FinderError::Interrupted)), or a
/// report that cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(ref args) => run_scan(&cli, args),
    }
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(args);
    log::debug!("Effective configuration: {:?}", config);

    let handler = signal::install_handler();
    let finder_config = config
        .finder_config()
        .context("Invalid configuration")?
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(Arc::new(Progress::new(cli.quiet)));

    let finder = DuplicateFinder::new(finder_config)?;
    let (report, summary) = finder.find_duplicates(&args.path)?;

    log_summary(&summary);

    let color = !cli.no_color && args.output.is_none() && io::stdout().is_terminal();
    match args.output {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            write_report(&report, args.format, color, BufWriter::new(file))
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            write_report(&report, args.format, color, io::stdout().lock())
                .context("Failed to write report")?;
        }
    }

    Ok(exit_code_for(&report, &summary))
}

/// Render `report` in the requested format.
///
/// # Errors
///
/// Returns an error if writing or CSV serialization fails.
pub fn write_report<W: Write>(
    report: &DuplicateReport,
    format: ReportFormat,
    color: bool,
    writer: W,
) -> Result<()> {
    match format {
        ReportFormat::Csv => CsvOutput::new(report).write_to(writer)?,
        ReportFormat::Tree => TreeOutput::new(report).with_color(color).write_to(writer)?,
    }
    Ok(())
}

/// Map a completed scan to its exit code.
#[must_use]
pub fn exit_code_for(report: &DuplicateReport, summary: &ScanSummary) -> ExitCode {
    if summary.has_errors() {
        ExitCode::PartialSuccess
    } else if report.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn log_summary(summary: &ScanSummary) {
    log::info!(
        "Scanned {} files ({}) in {:.2?}",
        summary.total_files,
        summary.total_size_display(),
        summary.scan_duration
    );
    log::info!(
        "Eliminated: {} by size, {} by partial content, {} by hash, {} by verification",
        summary.eliminated_by_size,
        summary.eliminated_by_partial,
        summary.eliminated_by_hash,
        summary.eliminated_by_verify
    );
    log::info!(
        "Found {} duplicate groups ({} redundant files, {} reclaimable)",
        summary.duplicate_groups,
        summary.duplicate_files,
        summary.reclaimable_display()
    );
    for err in &summary.file_errors {
        log::warn!("Excluded: {}", err);
    }
}
