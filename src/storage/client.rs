use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::error::StorageError;

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// One object in the destination bucket, as reported by a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub name: String,
    pub size: u64,
    pub content_hash: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Destination blob store.
///
/// Object-safe so the transfer path can hold an `Arc<dyn ObjectStore>` and
/// tests can substitute a mock-backed client.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local artifact to `name` within the configured bucket.
    /// Overwrites any existing object under the same name.
    async fn put_object(&self, name: &str, artifact: &Path) -> Result<(), StorageError>;

    /// List every object in the bucket, optionally restricted to a name
    /// prefix. Follows listing pagination to exhaustion.
    async fn list_objects(&self, prefix: Option<&str>) -> Result<Vec<StoredObject>, StorageError>;
}

/// Bucket client speaking the storage service's JSON API.
pub struct GcsObjectStore {
    http: Client,
    base_url: String,
    bucket: String,
    access_token: String,
}

impl GcsObjectStore {
    pub fn new(bucket: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, bucket, access_token)
    }

    pub fn with_base_url(
        base_url: &str,
        bucket: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put_object(&self, name: &str, artifact: &Path) -> Result<(), StorageError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);

        let file = tokio::fs::File::open(artifact).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .http
            .post(url)
            .query(&[("uploadType", "media"), ("name", name)])
            .bearer_auth(&self.access_token)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api { status, body });
        }

        Ok(())
    }

    async fn list_objects(&self, prefix: Option<&str>) -> Result<Vec<StoredObject>, StorageError> {
        let url = format!("{}/storage/v1/b/{}/o", self.base_url, self.bucket);

        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(prefix) = prefix {
                query.push(("prefix", prefix.to_string()));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(&url)
                .query(&query)
                .bearer_auth(&self.access_token)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(StorageError::Api { status, body });
            }

            let payload: ListObjectsResponse = response.json().await?;
            objects.extend(payload.items.into_iter().map(StoredObject::from));

            page_token = payload.next_page_token.filter(|token| !token.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<GcsObject>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Wire shape of one listed object. The API reports `size` as a decimal
/// string, not a number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcsObject {
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    md5_hash: Option<String>,
    #[serde(default)]
    time_created: Option<DateTime<Utc>>,
}

impl From<GcsObject> for StoredObject {
    fn from(raw: GcsObject) -> Self {
        Self {
            name: raw.name,
            size: raw.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            content_hash: raw.md5_hash,
            created_at: raw.time_created,
        }
    }
}
