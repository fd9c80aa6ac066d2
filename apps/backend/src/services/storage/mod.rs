//! Object storage for song audio.
//!
//! [`ObjectStore`] is the backend seam (local directory, S3). [`StorageClient`]
//! wraps a backend with key derivation, logging and a timeout on every call,
//! and is what the rest of the application talks to.

mod keys;
mod local;
mod s3;

pub use keys::{object_key, sanitize_file_name, ObjectKind, SongScope};
pub use local::LocalStore;
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::db::models::AudioRef;

/// Failures reported by an object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Network failure, timeout, throttling or any other transient condition
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    /// Credentials or policy rejected the operation
    #[error("object store denied access: {0}")]
    Denied(String),

    /// The object does not exist
    #[error("object not found: {0}")]
    NotFound(String),

    /// A URL or key that does not belong to this store
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    /// Maps a filesystem error onto the storage taxonomy.
    pub(crate) fn from_io(context: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(format!("{}: {}", context, err)),
            std::io::ErrorKind::PermissionDenied => {
                StorageError::Denied(format!("{}: {}", context, err))
            }
            _ => StorageError::Unavailable(format!("{}: {}", context, err)),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A write destination handed out before the payload is transferred.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    /// Object key inside the store.
    pub key: String,
    /// Where the payload is written: a pre-signed URL or a direct handle.
    pub upload_url: String,
    /// Stable URL recorded on tracks and track requests.
    pub object_url: String,
    pub content_type: String,
}

/// An audio payload received from a client.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl AudioUpload {
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}

/// Trait defining the interface for object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the backend type (e.g., "local", "s3").
    fn backend(&self) -> &str;

    /// Stable URL for a key, stored on records.
    fn object_url(&self, key: &str) -> String;

    /// Inverse of [`ObjectStore::object_url`].
    fn key_from_url(&self, url: &str) -> Option<String>;

    /// Returns a write destination for `key`.
    async fn presign_upload(&self, key: &str, content_type: &str) -> StorageResult<String>;

    /// Transfers the payload to a previously staged destination.
    async fn put(&self, staged: &StagedUpload, data: Bytes) -> StorageResult<()>;

    /// Writes the object at `key` to `dest`, returning the number of bytes written.
    async fn get_to_file(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Deletes the object at `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Storage client used by the workflow, the archive builder and the handlers.
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl StorageClient {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Creates a StorageClient wrapped in Arc for shared access.
    pub fn new_shared(store: Arc<dyn ObjectStore>, timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(store, timeout))
    }

    /// Builds the configured backend.
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<Self>> {
        let store: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::Local => Arc::new(LocalStore::new(config.local_root.clone())),
            StorageBackend::S3 => Arc::new(S3Store::from_config(config).await?),
        };

        tracing::info!(
            backend = %store.backend(),
            timeout_secs = config.timeout_secs,
            "Object storage initialized"
        );

        Ok(Self::new_shared(store, config.timeout()))
    }

    pub fn backend(&self) -> &str {
        self.store.backend()
    }

    /// Returns a write destination for one track or track request object.
    pub async fn stage_upload(
        &self,
        scope: SongScope<'_>,
        kind: ObjectKind,
        identifier: &str,
        content_type: &str,
        file_name: &str,
    ) -> StorageResult<StagedUpload> {
        let key = object_key(scope, kind, identifier, file_name);
        let upload_url = self
            .with_timeout("stage_upload", self.store.presign_upload(&key, content_type))
            .await?;

        tracing::debug!(key = %key, kind = %kind, "Staged upload");

        Ok(StagedUpload {
            object_url: self.store.object_url(&key),
            key,
            upload_url,
            content_type: content_type.to_string(),
        })
    }

    /// Transfers the payload to a staged destination.
    pub async fn upload(&self, staged: &StagedUpload, data: Bytes) -> StorageResult<()> {
        let size = data.len();
        self.with_timeout("upload", self.store.put(staged, data))
            .await?;
        tracing::info!(key = %staged.key, size, "Uploaded object");
        Ok(())
    }

    /// Stages and uploads an audio payload, returning the reference to record.
    pub async fn store_audio(
        &self,
        scope: SongScope<'_>,
        kind: ObjectKind,
        identifier: &str,
        upload: &AudioUpload,
    ) -> StorageResult<AudioRef> {
        let staged = self
            .stage_upload(
                scope,
                kind,
                identifier,
                &upload.content_type,
                &upload.file_name,
            )
            .await?;
        self.upload(&staged, upload.data.clone()).await?;

        Ok(AudioRef {
            url: staged.object_url,
            name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            size: upload.size(),
        })
    }

    /// Retrieves the object at `key` into `dest`.
    pub async fn download(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let written = self
            .with_timeout("download", self.store.get_to_file(key, dest))
            .await?;
        tracing::debug!(key = %key, dest = ?dest, bytes = written, "Downloaded object");
        Ok(written)
    }

    /// Retrieves the object a stored URL points at.
    pub async fn download_url(&self, url: &str, dest: &Path) -> StorageResult<u64> {
        let key = self.key_from_url(url)?;
        self.download(&key, dest).await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.with_timeout("delete", self.store.delete(key)).await?;
        tracing::debug!(key = %key, "Deleted object");
        Ok(())
    }

    /// Deletes the object behind a stored URL, logging instead of failing.
    pub async fn delete_url_best_effort(&self, url: &str) {
        let result = match self.key_from_url(url) {
            Ok(key) => self.delete(&key).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(url = %url, error = %e, "Failed to delete object");
        }
    }

    pub fn key_from_url(&self, url: &str) -> StorageResult<String> {
        self.store
            .key_from_url(url)
            .ok_or_else(|| StorageError::InvalidKey(url.to_string()))
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Object storage call timed out"
                );
                Err(StorageError::Unavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.timeout
                )))
            }
        }
    }
}
