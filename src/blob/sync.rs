//! Mirror the local CSV tree into the container.

use crate::blob::client::BlobStore;
use crate::error::SyncResult;
use crate::table::Table;
use colored::Colorize;
use std::path::Path;

/// What an upload pass did, by count.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    /// Files that could not be read or parsed as CSV (skipped).
    pub read_failures: usize,
    /// Files whose upload was rejected by the store.
    pub upload_failures: usize,
}

impl UploadReport {
    pub fn failures(&self) -> usize {
        self.read_failures + self.upload_failures
    }
}

/// Uploads a directory tree of CSV files to the container, one object per
/// file, and exposes the container's list/delete operations.
pub struct BlobSync {
    store: Box<dyn BlobStore>,
}

impl BlobSync {
    pub fn new(store: Box<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Walk `root` and upload every file found as an object named by the
    /// file's base name. Directories whose name appears in `excluded` are
    /// pruned at every level of the tree; the match is on the exact
    /// directory name, not the path, so an equally-named directory anywhere
    /// in the tree is excluded too.
    ///
    /// Object names are flat: files with the same base name in different
    /// directories land on the same object, last upload wins.
    pub fn upload_tree(&self, root: &Path, excluded: &[&str]) -> UploadReport {
        let mut report = UploadReport::default();
        self.walk(root, excluded, &mut report);
        report
    }

    fn walk(&self, dir: &Path, excluded: &[&str], report: &mut UploadReport) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), dir.display(), e);
                report.read_failures += 1;
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let name = entry.file_name();
                if excluded.iter().any(|excl| name.to_string_lossy() == *excl) {
                    continue;
                }
                self.walk(&path, excluded, report);
            } else {
                self.upload_file(&path, report);
            }
        }
    }

    fn upload_file(&self, path: &Path, report: &mut UploadReport) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            println!("  {} {}: not a valid object name", "✗".red(), path.display());
            report.read_failures += 1;
            return;
        };

        // Same round trip as the export side: parse, then re-render. A file
        // that is not CSV is logged and skipped, the walk goes on.
        let body = match Table::read_csv(path).and_then(|t| t.to_csv_string()) {
            Ok(body) => body,
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), path.display(), e);
                report.read_failures += 1;
                return;
            }
        };

        match self.store.put(name, &body) {
            Ok(()) => {
                println!("  {} {}", "↑".green(), name);
                report.uploaded += 1;
            }
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), name, e);
                report.upload_failures += 1;
            }
        }
    }

    /// Object names currently in the container, store order.
    pub fn list(&self) -> SyncResult<Vec<String>> {
        self.store.list()
    }

    /// Delete one object. Absence surfaces as the store's error; callers
    /// log and carry on.
    pub fn remove(&self, name: &str) -> SyncResult<()> {
        self.store.delete(name)
    }
}
