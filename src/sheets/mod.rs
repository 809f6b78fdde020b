//! Sheet export component: token supply, values API client, export pass.

mod auth;
mod client;
mod exporter;

pub use auth::{FileTokenProvider, StoredToken, TokenProvider};
pub use client::{selector, SheetFetcher, SheetsClient};
pub use exporter::{backup_file_name, csv_file_name, ExportReport, SheetExporter};
