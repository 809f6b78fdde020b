//! Blob Storage REST client (blocking), Shared Key Lite request signing.

use crate::config::BlobConfig;
use crate::error::{SyncError, SyncResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Service version sent as `x-ms-version` with every request.
const API_VERSION: &str = "2021-08-06";

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Anything that stores named text objects in a container.
pub trait BlobStore {
    /// Create-or-replace the named object.
    fn put(&self, name: &str, body: &str) -> SyncResult<()>;
    /// All object names currently in the container, in the store's own
    /// listing order.
    fn list(&self) -> SyncResult<Vec<String>>;
    /// Delete the named object. Deleting an absent object surfaces the
    /// store's not-found response as an error.
    fn delete(&self, name: &str) -> SyncResult<()>;
}

/// Shared Key Lite client bound to one container.
pub struct AzureBlobClient {
    http: reqwest::blocking::Client,
    account: String,
    key: Vec<u8>,
    container: String,
    endpoint: String,
}

impl AzureBlobClient {
    pub fn new(config: &BlobConfig) -> SyncResult<Self> {
        let key = BASE64
            .decode(config.account_key.trim())
            .map_err(|e| SyncError::Config(format!("account_key is not valid base64: {}", e)))?;

        Ok(Self {
            http: reqwest::blocking::Client::new(),
            account: config.account_name.clone(),
            key,
            container: config.container.clone(),
            endpoint: config.endpoint(),
        })
    }

    fn container_url(&self) -> SyncResult<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| SyncError::Config(format!("bad endpoint {}: {}", self.endpoint, e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .push(&self.container);
        Ok(url)
    }

    fn blob_url(&self, name: &str) -> SyncResult<Url> {
        let mut url = self.container_url()?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("endpoint {} cannot be a base", self.endpoint)))?
            .push(name);
        Ok(url)
    }

    /// `Authorization: SharedKeyLite {account}:{base64(hmac-sha256)}`.
    fn authorization(&self, string_to_sign: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        format!("SharedKeyLite {}:{}", self.account, signature)
    }

    fn rfc1123_now() -> String {
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }
}

impl BlobStore for AzureBlobClient {
    fn put(&self, name: &str, body: &str) -> SyncResult<()> {
        let date = Self::rfc1123_now();
        let resource = format!("/{}/{}/{}", self.account, self.container, name);
        let string_to_sign = put_string_to_sign(&date, CSV_CONTENT_TYPE, &resource);

        let response = self
            .http
            .put(self.blob_url(name)?)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("Content-Type", CSV_CONTENT_TYPE)
            .header("Authorization", self.authorization(&string_to_sign))
            .body(body.to_string())
            .send()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        check_status(response).map(|_| ())
    }

    fn list(&self) -> SyncResult<Vec<String>> {
        let date = Self::rfc1123_now();
        // Shared Key Lite canonicalizes only the comp parameter.
        let resource = format!("/{}/{}?comp=list", self.account, self.container);
        let string_to_sign = plain_string_to_sign("GET", &date, &resource);

        let mut url = self.container_url()?;
        url.set_query(Some("restype=container&comp=list"));

        let response = self
            .http
            .get(url)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("Authorization", self.authorization(&string_to_sign))
            .send()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let body = check_status(response)?
            .text()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        parse_blob_names(&body)
    }

    fn delete(&self, name: &str) -> SyncResult<()> {
        let date = Self::rfc1123_now();
        let resource = format!("/{}/{}/{}", self.account, self.container, name);
        let string_to_sign = plain_string_to_sign("DELETE", &date, &resource);

        let response = self
            .http
            .delete(self.blob_url(name)?)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("Authorization", self.authorization(&string_to_sign))
            .send()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        check_status(response).map(|_| ())
    }
}

/// Shared Key Lite string-to-sign for an upload, the only request that
/// carries a body and the blob-type header. Layout: verb, Content-MD5
/// (empty), Content-Type, Date (empty, x-ms-date is authoritative), the
/// canonicalized x-ms headers in name order, the canonicalized resource.
fn put_string_to_sign(date: &str, content_type: &str, resource: &str) -> String {
    format!(
        "PUT\n\n{}\n\nx-ms-blob-type:BlockBlob\nx-ms-date:{}\nx-ms-version:{}\n{}",
        content_type, date, API_VERSION, resource
    )
}

/// Shared Key Lite string-to-sign for body-less requests (list, delete).
fn plain_string_to_sign(verb: &str, date: &str, resource: &str) -> String {
    format!(
        "{}\n\n\n\nx-ms-date:{}\nx-ms-version:{}\n{}",
        verb, date, API_VERSION, resource
    )
}

fn check_status(
    response: reqwest::blocking::Response,
) -> SyncResult<reqwest::blocking::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Err(SyncError::Http(status, body))
    }
}

/// Pull the `<Name>` entries out of a List Blobs response body.
fn parse_blob_names(xml: &str) -> SyncResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    let mut in_name = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"Name" => in_name = true,
            Ok(Event::Text(t)) if in_name => {
                let text = t
                    .unescape()
                    .map_err(|e| SyncError::Storage(format!("malformed listing: {}", e)))?;
                names.push(text.into_owned());
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"Name" => in_name = false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SyncError::Storage(format!("malformed listing: {}", e))),
        }
    }
    Ok(names)
}
