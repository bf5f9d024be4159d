//! `ObjectStorage` backed by an S3-compatible service through `aws-sdk-s3`.

use crate::{
    config::S3Config,
    services::storage::{ListChunk, ObjectStorage, StorageError, StorageResult},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{
        BehaviorVersion, Credentials, Region, retry::RetryConfig, timeout::TimeoutConfig,
    },
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use std::fmt;
use tracing::debug;

/// Long-lived client handle for one bucket.
///
/// The SDK client is cheap to clone and safe to share between requests.
/// Retries are disabled so every call reaches the backend exactly once.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3Storage {
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None, // session token
            None, // expiration
            "folder-gateway-config",
        );
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(config.timeout)
            .operation_timeout(config.timeout)
            .build();

        let sdk_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .force_path_style(config.force_path_style)
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeouts)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
        max_keys: usize,
    ) -> StorageResult<ListChunk> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            // Subfolders roll up into common prefixes, which are not listed.
            .delimiter("/")
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX))
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|err| backend_error("list", prefix, err))?;

        let keys: Vec<String> = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();
        debug!(prefix, count = keys.len(), "listed objects");

        Ok(ListChunk {
            keys,
            next_token: output.next_continuation_token().map(str::to_owned),
        })
    }

    async fn put(&self, key: &str, body: Bytes, content_type: Option<String>) -> StorageResult<()> {
        let content_md5 = general_purpose::STANDARD.encode(md5::compute(&body).0);
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_content_type(content_type)
            .content_md5(content_md5)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| backend_error("put", key, err))?;

        debug!(key, size, "stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| backend_error("delete", key, err))?;

        debug!(key, "deleted object");
        Ok(())
    }
}

fn backend_error<E>(operation: &'static str, target: &str, err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Backend {
        operation,
        target: target.to_string(),
        detail: DisplayErrorContext(err).to_string(),
    }
}
