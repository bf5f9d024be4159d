//! In-memory `ObjectStorage` used by the test suites.
//!
//! Mirrors the backend behaviour the gateway relies on: lexicographic key
//! order, opaque continuation tokens, overwrite on put and idempotent delete.
//! Every call is counted so tests can assert that rejected requests never
//! reach the backend.

use crate::services::storage::{ListChunk, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: Option<String>,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    page_sizes: Mutex<Vec<usize>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let storage = Self::new();
        for key in keys {
            storage.insert(key, Bytes::new());
        }
        storage
    }

    /// Seed an object without counting it as a backend call.
    pub fn insert(&self, key: &str, body: Bytes) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: None,
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn body(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|o| o.body.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .and_then(|o| o.content_type.clone())
    }

    /// Number of list/put/delete calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_page_sizes(&self) -> Vec<usize> {
        self.page_sizes.lock().unwrap().clone()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Make every subsequent call fail like an unreachable backend.
    pub fn fail_all(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn begin(&self, operation: &'static str, target: &str) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                operation,
                target: target.to_string(),
                detail: "connection refused".into(),
            });
        }
        Ok(())
    }
}

fn encode_token(last_key: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(last_key)
}

fn decode_token(token: &str) -> Option<String> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
        max_keys: usize,
    ) -> StorageResult<ListChunk> {
        self.begin("list", prefix)?;
        self.page_sizes.lock().unwrap().push(max_keys);

        let start_after = match continuation_token {
            Some(token) => Some(decode_token(&token).ok_or_else(|| StorageError::Backend {
                operation: "list",
                target: prefix.to_string(),
                detail: "InvalidArgument: The continuation token provided is incorrect".into(),
            })?),
            None => None,
        };

        let objects = self.objects.lock().unwrap();
        let mut matching = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| start_after.as_deref().is_none_or(|after| key.as_str() > after));

        let keys: Vec<String> = matching.by_ref().take(max_keys).cloned().collect();
        let next_token = match (matching.next(), keys.last()) {
            (Some(_), Some(last)) => Some(encode_token(last)),
            _ => None,
        };

        Ok(ListChunk { keys, next_token })
    }

    async fn put(&self, key: &str, body: Bytes, content_type: Option<String>) -> StorageResult<()> {
        self.begin("put", key)?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), StoredObject { body, content_type });
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.begin("delete", key)?;
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
