//! S3-compatible object store.
//!
//! Uploads go through a pre-signed PUT URL so the same destination could be
//! handed to a browser; the server currently performs the PUT itself.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{ObjectStore, StagedUpload, StorageError, StorageResult};
use crate::config::StorageConfig;

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Store {
    client: Client,
    http: reqwest::Client,
    bucket: String,
    base_url: String,
    presign_expiry: Duration,
}

impl S3Store {
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::Unavailable("storage.bucket is not set".to_string()))?;
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "songhub-config",
            ));
        }
        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        let base_url = base_url(
            &bucket,
            &region,
            config.endpoint.as_deref(),
            config.public_base_url.as_deref(),
        );

        tracing::info!(bucket = %bucket, region = %region, base_url = %base_url, "S3 store configured");

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            http: reqwest::Client::new(),
            bucket,
            base_url,
            presign_expiry: config.presign_expiry(),
        })
    }
}

/// Root that object URLs are built from, without trailing slash.
fn base_url(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
    public_base_url: Option<&str>,
) -> String {
    match (public_base_url, endpoint) {
        (Some(public), _) => public.trim_end_matches('/').to_string(),
        (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        (None, None) => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

/// Maps an S3 error code onto the storage taxonomy.
fn classify(code: Option<&str>, message: String) -> StorageError {
    match code {
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AllAccessDisabled") => {
            StorageError::Denied(message)
        }
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => StorageError::NotFound(message),
        _ => StorageError::Unavailable(message),
    }
}

fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    classify(
        code.as_deref(),
        format!("{}: {}", operation, DisplayErrorContext(&err)),
    )
}

#[async_trait]
impl ObjectStore for S3Store {
    fn backend(&self) -> &str {
        "s3"
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    async fn presign_upload(&self, key: &str, content_type: &str) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| StorageError::Unavailable(format!("presigning config: {}", e)))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| sdk_error("presign put_object", e))?;

        Ok(request.uri().to_string())
    }

    async fn put(&self, staged: &StagedUpload, data: Bytes) -> StorageResult<()> {
        let response = self
            .http
            .put(&staged.upload_url)
            .header(reqwest::header::CONTENT_TYPE, &staged.content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(format!("upload {}: {}", staged.key, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = format!("upload {}: HTTP {}", staged.key, status);
        Err(match status {
            reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::UNAUTHORIZED => {
                StorageError::Denied(message)
            }
            reqwest::StatusCode::NOT_FOUND => StorageError::NotFound(message),
            _ => StorageError::Unavailable(message),
        })
    }

    async fn get_to_file(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let mut object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("get_object", e))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| StorageError::from_io("create download file", e))?;

        let mut written = 0u64;
        while let Some(chunk) = object
            .body
            .try_next()
            .await
            .map_err(|e| StorageError::Unavailable(format!("read {}: {}", key, e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::from_io("write download file", e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| StorageError::from_io("flush download file", e))?;

        Ok(written)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("delete_object", e))?;
        Ok(())
    }
}
