//! The export pass: fetch each active range, back up the previous CSV
//! artifact, write the fresh one.

use crate::config::{SheetSpec, SheetsConfig, WorkbookSpec};
use crate::error::SyncResult;
use crate::sheets::client::{selector, SheetFetcher};
use crate::table::Table;
use chrono::{DateTime, Local};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// What a full export pass did, by count. Failures are tallied here instead
/// of aborting the pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Sheets whose artifact was (re)written.
    pub exported: usize,
    /// Sheets skipped because the fetch returned no rows.
    pub skipped_empty: usize,
    /// Sheets whose remote fetch failed.
    pub fetch_failures: usize,
    /// Local I/O failures (directory creation, backup copy, artifact write).
    pub write_failures: usize,
    /// Backups taken of pre-existing artifacts.
    pub backups: usize,
}

impl ExportReport {
    pub fn failures(&self) -> usize {
        self.fetch_failures + self.write_failures
    }
}

/// Runs the export pass over every active workbook/sheet in configuration
/// order, single-threaded. One sheet's failure never aborts the pass, and a
/// failed fetch leaves the destination artifact untouched.
pub struct SheetExporter {
    config: SheetsConfig,
    fetcher: Box<dyn SheetFetcher>,
}

impl SheetExporter {
    pub fn new(config: SheetsConfig, fetcher: Box<dyn SheetFetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn export_all(&mut self) -> ExportReport {
        let mut report = ExportReport::default();
        let config = self.config.clone();

        for workbook in config.workbooks.iter().filter(|w| w.active) {
            for sheet in workbook.sheets.iter().filter(|s| s.active) {
                export_sheet(&config, self.fetcher.as_mut(), workbook, sheet, &mut report);
            }
        }
        report
    }
}

fn export_sheet(
    config: &SheetsConfig,
    fetcher: &mut dyn SheetFetcher,
    workbook: &WorkbookSpec,
    sheet: &SheetSpec,
    report: &mut ExportReport,
) {
    let file_name = csv_file_name(&workbook.file_name, &sheet.file_name);

    if let Err(e) = create_directories(config, &workbook.file_name) {
        println!("  {} {}: {}", "✗".red(), file_name, e);
        report.write_failures += 1;
        return;
    }

    let range = selector(&sheet.name, &sheet.range);
    let grid = match fetcher.fetch_values(&workbook.id, &range) {
        Ok(grid) => grid,
        Err(e) => {
            println!("  {} {} ({}): {}", "✗".red(), file_name, range, e);
            report.fetch_failures += 1;
            return;
        }
    };

    let Some(table) = Table::from_grid(grid) else {
        println!("  {} {}: no data found, skipping", "-".yellow(), file_name);
        report.skipped_empty += 1;
        return;
    };

    let destination = config
        .data_dir
        .join(&workbook.file_name)
        .join(&file_name);

    match backup_existing(config, &destination, &file_name) {
        Ok(Some(backup_path)) => {
            println!("  {} {}", "↷".cyan(), backup_path.display());
            report.backups += 1;
        }
        Ok(None) => {}
        Err(e) => {
            // The fresh artifact is still written below.
            println!("  {} backup of {}: {}", "✗".red(), file_name, e);
            report.write_failures += 1;
        }
    }

    match table.write_csv(&destination) {
        Ok(()) => {
            println!(
                "  {} {} ({} rows)",
                "✓".green(),
                destination.display(),
                table.rows().len()
            );
            report.exported += 1;
        }
        Err(e) => {
            println!("  {} {}: {}", "✗".red(), destination.display(), e);
            report.write_failures += 1;
        }
    }
}

/// Idempotently create `{data_dir}/{workbook_stem}/` and the backup folder.
fn create_directories(config: &SheetsConfig, workbook_stem: &str) -> SyncResult<()> {
    fs::create_dir_all(config.data_dir.join(workbook_stem))?;
    fs::create_dir_all(config.data_dir.join(&config.backup_dir))?;
    Ok(())
}

/// Copy the current artifact, if there is one, aside under a timestamped
/// name. Returns the backup path when a backup was taken. A destination
/// that is missing or unreadable as CSV counts as "no prior data".
fn backup_existing(
    config: &SheetsConfig,
    destination: &Path,
    file_name: &str,
) -> SyncResult<Option<PathBuf>> {
    if Table::read_csv(destination).is_err() {
        return Ok(None);
    }
    let backup_path = config
        .data_dir
        .join(&config.backup_dir)
        .join(backup_file_name(Local::now(), file_name));
    fs::copy(destination, &backup_path)?;
    Ok(Some(backup_path))
}

/// Destination file name for a (workbook, sheet) pair:
/// `{workbook_stem}_{sheet_stem}.csv`.
pub fn csv_file_name(workbook_stem: &str, sheet_stem: &str) -> String {
    format!("{}_{}.csv", workbook_stem, sheet_stem)
}

/// Backup file name: `{YYYYMMDD}_{HHMMSS}_bkp_{original}`.
pub fn backup_file_name(at: DateTime<Local>, original: &str) -> String {
    format!("{}_{}_bkp_{}", at.format("%Y%m%d"), at.format("%H%M%S"), original)
}
