//! The capability interface the gateway needs from an object-storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// One backend listing call's worth of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListChunk {
    /// Full object keys, in backend (lexicographic) order.
    pub keys: Vec<String>,

    /// Opaque continuation token; `None` when the listing is exhausted.
    pub next_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} `{target}` failed: {detail}")]
    Backend {
        operation: &'static str,
        target: String,
        detail: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// List, put and delete by key against a single bucket.
///
/// Implementations are shared across requests and must be safe for
/// concurrent use. Each call is attempted exactly once.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List keys under `prefix`, resuming from `continuation_token`,
    /// returning at most `max_keys` keys.
    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
        max_keys: usize,
    ) -> StorageResult<ListChunk>;

    /// Create or overwrite the object at `key`.
    async fn put(&self, key: &str, body: Bytes, content_type: Option<String>) -> StorageResult<()>;

    /// Delete the object at `key`. A missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
