//! Object storage access for evidence attachments.
//!
//! Attachments live in Google Cloud Storage and are addressed by
//! `gs://bucket/object/path` locators. The core only sees the
//! [`EvidenceFetcher`], which turns every failure into "not available".

use async_trait::async_trait;
use reqwest::Url;
use std::env;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

pub const LOCATOR_SCHEME: &str = "gs://";
const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("object {bucket}/{object} not found")]
    NotFound { bucket: String, object: String },
    #[error("storage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Read access to a bucketed object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError>;
}

/// A parsed `gs://bucket/object` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub bucket: String,
    pub object: String,
}

impl Locator {
    /// Parse a locator; `None` unless it has the scheme, a bucket and an object path.
    pub fn parse(raw: &str) -> Option<Self> {
        let path = raw.trim().strip_prefix(LOCATOR_SCHEME)?;
        let (bucket, object) = path.split_once('/')?;
        if bucket.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    }
}

/// Best-effort retrieval of attachment bytes.
#[derive(Clone, Copy)]
pub struct EvidenceFetcher<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> EvidenceFetcher<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Fetch the object behind `locator`, or `None` when it is absent,
    /// malformed or cannot be downloaded. The reader starts at offset 0.
    pub async fn fetch(&self, locator: Option<&str>) -> Option<Cursor<Vec<u8>>> {
        let raw = locator?;
        let Some(parsed) = Locator::parse(raw) else {
            log::warn!("ignoring malformed evidence locator '{}'", raw);
            return None;
        };

        match self.store.download(&parsed.bucket, &parsed.object).await {
            Ok(bytes) => {
                log::debug!("fetched {} ({} bytes)", raw, bytes.len());
                Some(Cursor::new(bytes))
            }
            Err(e) => {
                log::warn!("evidence {} not available: {}", raw, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GcsConfig {
    pub endpoint: String,
    /// OAuth bearer token; public buckets work without one.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl GcsConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("GCS_ENDPOINT").unwrap_or_else(|_| DEFAULT_GCS_ENDPOINT.to_string()),
            access_token: env::var("GCS_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

/// Google Cloud Storage JSON API client.
pub struct GcsStorage {
    config: GcsConfig,
    client: reqwest::Client,
}

impl GcsStorage {
    pub fn new(config: GcsConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Media download URL for an object; the object path is sent as one encoded segment.
    pub fn object_url(&self, bucket: &str, object: &str) -> Result<Url, StorageError> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidEndpoint(self.config.endpoint.clone()))?
            .pop_if_empty()
            .extend(&["storage", "v1", "b", bucket, "o", object]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsStorage {
    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.object_url(bucket, object)?;

        let mut request = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.timeout_secs));
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcs(endpoint: &str) -> GcsStorage {
        GcsStorage::new(
            GcsConfig {
                endpoint: endpoint.to_string(),
                access_token: None,
                timeout_secs: 5,
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_locator_parse() {
        assert_eq!(
            Locator::parse("gs://evidence/acme/x.pdf"),
            Some(Locator {
                bucket: "evidence".into(),
                object: "acme/x.pdf".into()
            })
        );
    }

    #[test]
    fn test_locator_rejects_malformed() {
        assert_eq!(Locator::parse(""), None);
        assert_eq!(Locator::parse("s3://bucket/x.pdf"), None);
        assert_eq!(Locator::parse("gs://bucket"), None);
        assert_eq!(Locator::parse("gs:///x.pdf"), None);
        assert_eq!(Locator::parse("gs://bucket/"), None);
    }

    #[test]
    fn test_object_url_encodes_path() {
        let url = gcs("https://storage.googleapis.com")
            .object_url("evidence", "acme/x y.pdf")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/evidence/o/acme%2Fx%20y.pdf?alt=media"
        );
    }

    #[test]
    fn test_object_url_with_trailing_slash_endpoint() {
        let url = gcs("http://localhost:4443/").object_url("b", "x.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4443/storage/v1/b/b/o/x.pdf?alt=media"
        );
    }

    #[test]
    fn test_object_url_invalid_endpoint() {
        assert!(matches!(
            gcs("not a url").object_url("b", "x.pdf"),
            Err(StorageError::InvalidEndpoint(_))
        ));
    }
}
