//! The one pipeline command: export every active sheet, mirror the CSV tree
//! into the container, print the resulting object listing.

use crate::blob::{AzureBlobClient, BlobSync, UploadReport};
use crate::config::{BlobConfig, SheetsConfig};
use crate::error::SyncResult;
use crate::sheets::{ExportReport, FileTokenProvider, SheetExporter, SheetsClient};
use colored::Colorize;
use std::path::Path;

/// Combined outcome of an export-then-upload run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub export: ExportReport,
    pub upload: UploadReport,
    pub list_failed: bool,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.export.failures() + self.upload.failures() + usize::from(self.list_failed)
    }
}

/// Run the full pipeline from the two config documents in `config_dir`.
///
/// Only configuration problems surface as `Err`; everything downstream is
/// logged, counted into the summary, and never halts the batch.
pub fn run(config_dir: &Path, verbose: bool) -> SyncResult<RunSummary> {
    let sheets_config = SheetsConfig::load(&config_dir.join("sheets_config.json"))?;
    let blob_config = BlobConfig::load(&config_dir.join("blob_config.json"))?;

    let data_dir = sheets_config.data_dir.clone();
    let backup_dir = sheets_config.backup_dir.clone();

    println!("{}", "📥 Sheetsync - Exporting sheets".bold().green());
    if verbose {
        println!("   Config dir: {}", config_dir.display());
        println!("   Data dir: {}", data_dir.display());
        println!(
            "   Workbooks: {} ({} active)",
            sheets_config.workbooks.len(),
            sheets_config.workbooks.iter().filter(|w| w.active).count()
        );
    }

    let tokens = FileTokenProvider::new(&sheets_config.token_filename);
    let client = SheetsClient::new(&sheets_config.api_base, Box::new(tokens));
    let mut exporter = SheetExporter::new(sheets_config, Box::new(client));
    let export = exporter.export_all();
    print_export_summary(&export);

    println!("{}", "📤 Uploading CSV tree".bold().green());
    let store = AzureBlobClient::new(&blob_config)?;
    let sync = BlobSync::new(Box::new(store));
    let upload = sync.upload_tree(&data_dir, &[backup_dir.as_str()]);
    print_upload_summary(&upload);

    println!("{}", "🗂  Objects in container:".bold().cyan());
    let list_failed = match sync.list() {
        Ok(names) if names.is_empty() => {
            println!("   (none)");
            false
        }
        Ok(names) => {
            for name in names {
                println!("   {}", name);
            }
            false
        }
        Err(e) => {
            println!("   {} listing failed: {}", "✗".red(), e);
            true
        }
    };

    Ok(RunSummary {
        export,
        upload,
        list_failed,
    })
}

fn print_export_summary(report: &ExportReport) {
    let failures = report.failures();
    let counts = format!(
        "{} exported, {} empty, {} backed up",
        report.exported, report.skipped_empty, report.backups
    );
    if failures > 0 {
        println!("   {}, {}\n", counts, format!("{} failed", failures).red());
    } else {
        println!("   {}\n", counts);
    }
}

fn print_upload_summary(report: &UploadReport) {
    let failures = report.failures();
    if failures > 0 {
        println!(
            "   {} uploaded, {}\n",
            report.uploaded,
            format!("{} failed", failures).red()
        );
    } else {
        println!("   {} uploaded\n", report.uploaded);
    }
}
