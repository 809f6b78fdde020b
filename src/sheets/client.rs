//! Values API client (blocking).

use crate::error::{SyncError, SyncResult};
use crate::sheets::auth::TokenProvider;
use serde::Deserialize;
use url::Url;

/// Anything able to fetch the raw value grid for a `{sheet}!{range}`
/// selector of one spreadsheet.
pub trait SheetFetcher {
    fn fetch_values(
        &mut self,
        spreadsheet_id: &str,
        selector: &str,
    ) -> SyncResult<Vec<Vec<String>>>;
}

/// `spreadsheets.values.get` response body. `values` is omitted entirely
/// when the requested range is empty.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Blocking REST client for the values endpoint.
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: String,
    tokens: Box<dyn TokenProvider>,
}

impl SheetsClient {
    pub fn new(api_base: &str, tokens: Box<dyn TokenProvider>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("sheetsync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn values_url(&self, spreadsheet_id: &str, selector: &str) -> SyncResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SyncError::Config(format!("bad api_base {}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("api_base {} cannot be a base", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", selector]);
        Ok(url)
    }
}

impl SheetFetcher for SheetsClient {
    fn fetch_values(
        &mut self,
        spreadsheet_id: &str,
        selector: &str,
    ) -> SyncResult<Vec<Vec<String>>> {
        let token = self.tokens.bearer_token()?;
        let url = self.values_url(spreadsheet_id, selector)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .send()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Http(status, body));
        }

        let range: ValueRange = response
            .json()
            .map_err(|e| SyncError::Network(format!("malformed values response: {}", e)))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

/// Build the `{sheet_name}!{range}` selector the values endpoint expects.
pub fn selector(sheet_name: &str, range: &str) -> String {
    format!("{}!{}", sheet_name, range)
}

/// Cells arrive as JSON strings, numbers or booleans; everything downstream
/// carries text.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
