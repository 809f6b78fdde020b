//! Run configuration: the two JSON documents the job is driven by.
//!
//! `sheets_config.json` names the workbooks and ranges to export and where
//! the local CSV tree lives; `blob_config.json` names the storage account and
//! container the tree is mirrored into. Both are loaded once at startup and
//! handed to the components by value.

use crate::error::{SyncError, SyncResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_backup_dir() -> String {
    "bkp".to_string()
}

/// Sheets-side configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// OAuth scopes the stored token was granted for.
    pub scopes: Vec<String>,
    /// Path of the stored (granted and refreshable) token JSON.
    pub token_filename: PathBuf,
    /// Path of the OAuth client secrets file. Consumed by the external
    /// consent flow, not by this binary; kept here so one document describes
    /// the whole setup.
    pub credentials_filename: PathBuf,
    /// Base URL of the Sheets API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Root of the local CSV tree.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Name of the backup subdirectory under `data_dir`.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// Workbooks to export, in order.
    pub workbooks: Vec<WorkbookSpec>,
}

/// One remote spreadsheet document.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkbookSpec {
    /// Spreadsheet ID (the long token in the document URL).
    pub id: String,
    /// Local file-name stem for this workbook's CSV artifacts.
    pub file_name: String,
    pub active: bool,
    pub sheets: Vec<SheetSpec>,
}

/// One named range within a workbook.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetSpec {
    /// Tab name as it appears in the workbook.
    pub name: String,
    /// Cell range expression, e.g. "A1:C10".
    pub range: String,
    /// Local file-name stem for this sheet's CSV artifact.
    pub file_name: String,
    pub active: bool,
}

/// Blob-side configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    pub account_name: String,
    /// Base64 account key, as shown in the portal.
    pub account_key: String,
    pub container: String,
    /// Endpoint override (Azurite and friends). Defaults to the public
    /// `https://{account}.blob.core.windows.net`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl SheetsConfig {
    pub fn load(path: &Path) -> SyncResult<Self> {
        load_json(path)
    }
}

impl BlobConfig {
    pub fn load(path: &Path) -> SyncResult<Self> {
        load_json(path)
    }

    /// Service endpoint for this account, without a trailing slash.
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account_name),
        }
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> SyncResult<T> {
    let contents = fs::read_to_string(path)
        .map_err(|e| SyncError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| SyncError::Config(format!("cannot parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SHEETS_JSON: &str = r#"{
        "scopes": ["https://www.googleapis.com/auth/spreadsheets.readonly"],
        "token_filename": "token.json",
        "credentials_filename": "credentials.json",
        "workbooks": [
            {
                "id": "1AbC",
                "file_name": "Sales",
                "active": true,
                "sheets": [
                    {"name": "Q1", "range": "A1:C10", "file_name": "Q1", "active": true},
                    {"name": "Q2", "range": "A1:C10", "file_name": "Q2", "active": false}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_sheets_config_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SHEETS_JSON.as_bytes()).unwrap();

        let config = SheetsConfig::load(file.path()).unwrap();
        assert_eq!(config.api_base, "https://sheets.googleapis.com");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.backup_dir, "bkp");
        assert_eq!(config.workbooks.len(), 1);
        assert_eq!(config.workbooks[0].sheets.len(), 2);
        assert!(config.workbooks[0].active);
        assert!(!config.workbooks[0].sheets[1].active);
    }

    #[test]
    fn test_sheets_config_missing_file() {
        let err = SheetsConfig::load(Path::new("/nonexistent/sheets_config.json")).unwrap_err();
        assert!(err.to_string().contains("sheets_config.json"));
    }

    #[test]
    fn test_sheets_config_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        let err = SheetsConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_blob_config_default_endpoint() {
        let json = r#"{"account_name": "acme", "account_key": "a2V5", "container": "exports"}"#;
        let config: BlobConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint(), "https://acme.blob.core.windows.net");
    }

    #[test]
    fn test_blob_config_endpoint_override() {
        let json = r#"{
            "account_name": "devstoreaccount1",
            "account_key": "a2V5",
            "container": "exports",
            "endpoint": "http://127.0.0.1:10000/devstoreaccount1/"
        }"#;
        let config: BlobConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint(), "http://127.0.0.1:10000/devstoreaccount1");
    }
}
