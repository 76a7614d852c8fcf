/// Object storage for processed voice recordings
///
/// Objects are addressed by key and served from a deterministic public URL,
/// so the URL can be stored on the comment as soon as the upload succeeds.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Stored object metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key
    pub key: String,

    /// Public URL of the object
    pub url: String,

    /// Size in bytes
    pub size: u64,

    /// MIME content type
    pub content_type: String,
}

/// Storage backend
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores `data` under `key`, replacing any existing object
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<StoredObject>;

    /// Removes an object; missing objects are not an error
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Public URL for a key
    fn public_url(&self, key: &str) -> String;
}

/// Rejects keys that would escape the storage root
fn ensure_plain_key(key: &str) -> StoreResult<()> {
    let path = Path::new(key);
    let plain = !key.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));

    if plain {
        Ok(())
    } else {
        Err(StoreError::Storage(format!("invalid object key: {:?}", key)))
    }
}

/// Local filesystem storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<StoredObject> {
        ensure_plain_key(key)?;
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(format!("failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| StoreError::Storage(format!("failed to write {}: {}", path.display(), e)))?;

        debug!(key = %key, bytes = data.len(), "Stored object on local disk");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        ensure_plain_key(key)?;

        match tokio::fs::remove_file(self.base_path.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!("failed to delete {}: {}", key, e))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Public bucket reachable over HTTPS
///
/// Objects are written with `PUT https://<host>/<key>` and read back from the
/// same URL.
#[derive(Debug, Clone)]
pub struct BucketStorage {
    host: String,
    client: Client,
}

impl BucketStorage {
    pub fn new(host: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Storage(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            host: host.into(),
            client,
        })
    }
}

#[async_trait]
impl StorageBackend for BucketStorage {
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<StoredObject> {
        ensure_plain_key(key)?;
        let url = self.public_url(key);
        let size = data.len() as u64;

        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Bucket upload failed");
                StoreError::Storage(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(key = %key, status = %status, "Bucket rejected upload");
            return Err(StoreError::Storage(format!("bucket returned {} for {}", status, key)));
        }

        debug!(key = %key, bytes = size, "Stored object in bucket");

        Ok(StoredObject {
            key: key.to_string(),
            url,
            size,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        ensure_plain_key(key)?;

        let response = self
            .client
            .delete(self.public_url(key))
            .send()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StoreError::Storage(format!("bucket returned {} for {}", status, key)))
        }
    }

    fn public_url(&self, key: &str) -> String {
        let host = self
            .host
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{}/{}", host, key)
    }
}
