use anyhow::Context;
use clap::Parser;
use sheetsync::cli;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Export Google Sheets ranges to CSV and mirror them into Azure Blob Storage.")]
#[command(long_about = "Sheetsync - scheduled spreadsheet-to-blob pipeline

A no-argument invocation runs the full pass: every active sheet listed in
sheets_config.json is fetched and written into the local CSV tree (the
previous artifact is kept aside as a timestamped backup), then the tree is
mirrored into the container from blob_config.json and the resulting object
listing is printed.

All behavior is driven by the two config documents, not by flags; the flags
below only choose where to find them and how chatty to be.

EXIT CODES:
  0  clean run
  1  run completed, but at least one sheet or upload failed
  2  configuration could not be loaded")]
#[command(version)]
struct Cli {
    /// Directory containing sheets_config.json and blob_config.json
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Show configuration detail while running
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let summary = match cli::run(&cli.config_dir, cli.verbose)
        .with_context(|| format!("running from config in {}", cli.config_dir.display()))
    {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("sheetsync: {:#}", e);
            return ExitCode::from(2);
        }
    };

    if summary.failures() > 0 {
        eprintln!(
            "sheetsync: run completed with {} failure(s)",
            summary.failures()
        );
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
