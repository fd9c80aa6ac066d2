//! Object store backed by a local directory.
//!
//! Objects live at `{root}/{key}` and are addressed as `local://{key}`. Upload
//! destinations are the object URL itself, since there is nothing to sign.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

use super::{ObjectStore, StagedUpload, StorageError, StorageResult};

const URL_SCHEME: &str = "local://";

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key under the root, rejecting traversal and symlinks that
    /// point outside it.
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);

        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(StorageError::InvalidKey(format!(
                    "{}: invalid path component {:?}",
                    key, component
                )));
            }
        }

        let mut current = self.root.clone();
        for component in relative.components() {
            current.push(component);
            if let Ok(metadata) = tokio::fs::symlink_metadata(&current).await {
                if metadata.is_symlink() {
                    let resolved = tokio::fs::canonicalize(&current)
                        .await
                        .map_err(|e| StorageError::from_io("resolve symlink", e))?;
                    let canonical_root = tokio::fs::canonicalize(&self.root)
                        .await
                        .map_err(|e| StorageError::from_io("resolve root", e))?;
                    if !resolved.starts_with(&canonical_root) {
                        return Err(StorageError::InvalidKey(format!(
                            "{}: symlink escapes storage root",
                            key
                        )));
                    }
                }
            }
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn backend(&self) -> &str {
        "local"
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}{}", URL_SCHEME, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(URL_SCHEME)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    async fn presign_upload(&self, key: &str, _content_type: &str) -> StorageResult<String> {
        self.resolve(key).await?;
        Ok(self.object_url(key))
    }

    async fn put(&self, staged: &StagedUpload, data: Bytes) -> StorageResult<()> {
        let path = self.resolve(&staged.key).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io("create directory", e))?;
        }

        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| StorageError::from_io("write object", e))?;

        tracing::debug!(path = ?path, size = data.len(), "Object written");
        Ok(())
    }

    async fn get_to_file(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let path = self.resolve(key).await?;
        tokio::fs::copy(&path, dest)
            .await
            .map_err(|e| StorageError::from_io(key, e))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io("delete object", e)),
        }
    }
}
