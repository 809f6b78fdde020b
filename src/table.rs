//! In-memory text table: the shape the values API returns and the CSV
//! artifacts store on disk.

use crate::error::{SyncError, SyncResult};
use std::path::Path;

/// Ordered column headers plus data rows, every value carried as text.
///
/// Invariant: every row holds exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from a raw value grid, first row as headers.
    ///
    /// Returns `None` for an empty grid (the sheet is skipped entirely in
    /// that case). Data rows are padded with empty cells or truncated so
    /// every row matches the header width.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Option<Self> {
        let mut grid = grid.into_iter();
        let headers = grid.next()?;
        let width = headers.len();
        let rows = grid
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Some(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Parse a CSV file written by a previous run.
    pub fn read_csv(path: &Path) -> SyncResult<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(String::from).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Write the table as a CSV file, header row first, overwriting any
    /// existing file.
    pub fn write_csv(&self, path: &Path) -> SyncResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Render the table as CSV text, exactly as [`Table::write_csv`] lays it
    /// out on disk. This is what an uploaded object contains.
    pub fn to_csv_string(&self) -> SyncResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| SyncError::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn grid(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_from_grid_empty_yields_none() {
        assert!(Table::from_grid(Vec::new()).is_none());
    }

    #[test]
    fn test_from_grid_header_only() {
        let table = Table::from_grid(grid(&[&["Date", "Region"]])).unwrap();
        assert_eq!(table.headers(), &["Date", "Region"]);
        assert!(table.rows().is_empty());
    }

    #[test]
    fn test_from_grid_splits_header_and_rows() {
        let table = Table::from_grid(grid(&[
            &["Date", "Region", "Amount"],
            &["2024-01-01", "East", "100"],
        ]))
        .unwrap();
        assert_eq!(table.headers(), &["Date", "Region", "Amount"]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0], &["2024-01-01", "East", "100"]);
    }

    #[test]
    fn test_from_grid_pads_and_truncates_ragged_rows() {
        let table = Table::from_grid(grid(&[
            &["A", "B", "C"],
            &["1"],
            &["1", "2", "3", "4"],
        ]))
        .unwrap();
        assert_eq!(table.rows()[0], &["1", "", ""]);
        assert_eq!(table.rows()[1], &["1", "2", "3"]);
    }

    #[test]
    fn test_csv_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let table = Table::from_grid(grid(&[
            &["Date", "Region", "Amount"],
            &["2024-01-01", "East", "100"],
            &["2024-01-02", "West", "250"],
        ]))
        .unwrap();
        table.write_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Date,Region,Amount\n2024-01-01,East,100\n2024-01-02,West,250\n"
        );

        let read_back = Table::read_csv(&path).unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn test_to_csv_string_matches_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let table = Table::from_grid(grid(&[&["A", "B"], &["1", "2"]])).unwrap();
        table.write_csv(&path).unwrap();

        let from_file = std::fs::read_to_string(&path).unwrap();
        assert_eq!(table.to_csv_string().unwrap(), from_file);
    }

    #[test]
    fn test_read_csv_missing_file_is_err() {
        assert!(Table::read_csv(Path::new("/nonexistent/na.csv")).is_err());
    }

    #[test]
    fn test_values_with_commas_are_quoted() {
        let table = Table::from_grid(grid(&[&["Name"], &["Doe, Jane"]])).unwrap();
        assert_eq!(table.to_csv_string().unwrap(), "Name\n\"Doe, Jane\"\n");
    }
}
