//! Bearer-token supply for the values API.
//!
//! The one-time interactive consent flow happens outside this binary. What
//! lives here is the token material that flow leaves behind: load it from
//! disk, refresh it against the token endpoint when it has expired, and
//! persist the refreshed token for the next run.

use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Anything able to produce a currently-valid bearer token.
pub trait TokenProvider {
    fn bearer_token(&mut self) -> SyncResult<String>;
}

/// Token material persisted by the consent flow and rewritten on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Instant the access token expires at. Absent means "assume valid".
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Tokens within a minute of their expiry count as expired, so a token
    /// that is valid now cannot lapse mid-request.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(60) >= expiry,
            None => false,
        }
    }
}

/// Body of a successful refresh response from the token endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// [`TokenProvider`] backed by the token file on disk.
pub struct FileTokenProvider {
    path: PathBuf,
    http: reqwest::blocking::Client,
    cached: Option<StoredToken>,
}

impl FileTokenProvider {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            http: reqwest::blocking::Client::new(),
            cached: None,
        }
    }

    fn load(&self) -> SyncResult<StoredToken> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            SyncError::Auth(format!(
                "cannot read token file {} (complete the consent flow first): {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            SyncError::Auth(format!(
                "malformed token file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn refresh(&self, token: &mut StoredToken) -> SyncResult<()> {
        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            SyncError::Auth("token expired and no refresh token is stored".to_string())
        })?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(&token.token_uri)
            .form(&params)
            .send()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Http(status, body));
        }

        let refreshed: RefreshResponse = response
            .json()
            .map_err(|e| SyncError::Auth(format!("malformed refresh response: {}", e)))?;

        token.access_token = refreshed.access_token;
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        // Persist so the next run starts from the fresh token.
        fs::write(&self.path, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }
}

impl TokenProvider for FileTokenProvider {
    fn bearer_token(&mut self) -> SyncResult<String> {
        let mut token = match self.cached.take() {
            Some(token) => token,
            None => self.load()?,
        };
        if token.is_expired(Utc::now()) {
            self.refresh(&mut token)?;
        }
        let bearer = token.access_token.clone();
        self.cached = Some(token);
        Ok(bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(expiry: Option<DateTime<Utc>>) -> StoredToken {
        StoredToken {
            access_token: "ya29.test".into(),
            refresh_token: Some("1//refresh".into()),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            token_uri: default_token_uri(),
            expiry,
        }
    }

    #[test]
    fn test_is_expired_before_and_after() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let fresh = token(Some(now + Duration::hours(1)));
        let stale = token(Some(now - Duration::hours(1)));

        assert!(!fresh.is_expired(now));
        assert!(stale.is_expired(now));
    }

    #[test]
    fn test_is_expired_within_leeway() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        // 30s of validity left is inside the one-minute leeway
        let nearly = token(Some(now + Duration::seconds(30)));
        assert!(nearly.is_expired(now));
    }

    #[test]
    fn test_is_expired_without_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert!(!token(None).is_expired(now));
    }

    #[test]
    fn test_stored_token_round_trip() {
        let original = token(Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()));
        let json = serde_json::to_string_pretty(&original).unwrap();
        let parsed: StoredToken = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.access_token, "ya29.test");
        assert_eq!(parsed.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(parsed.expiry, original.expiry);
    }

    #[test]
    fn test_stored_token_defaults() {
        let json = r#"{
            "access_token": "ya29.x",
            "client_id": "id",
            "client_secret": "secret"
        }"#;
        let parsed: StoredToken = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.token_uri, "https://oauth2.googleapis.com/token");
        assert!(parsed.refresh_token.is_none());
        assert!(parsed.expiry.is_none());
    }

    #[test]
    fn test_refresh_response_parsing() {
        let json = r#"{"access_token": "ya29.new", "expires_in": 3599, "token_type": "Bearer"}"#;
        let parsed: RefreshResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "ya29.new");
        assert_eq!(parsed.expires_in, Some(3599));
    }

    #[test]
    fn test_file_provider_returns_valid_token_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let stored = token(Some(Utc::now() + Duration::hours(1)));
        std::fs::write(&path, serde_json::to_string_pretty(&stored).unwrap()).unwrap();

        let mut provider = FileTokenProvider::new(&path);
        assert_eq!(provider.bearer_token().unwrap(), "ya29.test");
        // Second call is served from cache
        assert_eq!(provider.bearer_token().unwrap(), "ya29.test");
    }

    #[test]
    fn test_file_provider_missing_file() {
        let mut provider = FileTokenProvider::new(Path::new("/nonexistent/token.json"));
        let err = provider.bearer_token().unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
        assert!(err.to_string().contains("consent flow"));
    }
}
