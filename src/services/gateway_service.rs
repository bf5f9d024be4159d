//! src/services/gateway_service.rs
//!
//! GatewayService: list, upload and delete for files under one fixed folder
//! of a bucket. It owns the folder/key arithmetic and the public URL scheme;
//! all backend I/O goes through the shared `ObjectStorage` handle.

use crate::{
    models::object::{ListingPage, ObjectEntry, StoredFile},
    services::{
        filename::secure_filename,
        storage::{ObjectStorage, StorageError},
    },
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Largest page a single listing call may return.
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no file uploaded")]
    MissingFile,
    #[error("missing filename")]
    MissingFilename,
    #[error("invalid filename `{0}`")]
    InvalidFilename(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Clone)]
pub struct GatewayService {
    storage: Arc<dyn ObjectStorage>,

    /// Key prefix, empty or ending in `/`.
    folder: String,

    /// Base for download links, without a trailing slash.
    public_url: String,
}

impl GatewayService {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        folder: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            folder: folder.into(),
            public_url: public_url.into(),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Fetch one page of the folder listing.
    ///
    /// The token is forwarded to the backend untouched; an empty token is the
    /// same as none. Directory markers and keys outside the folder are
    /// skipped, so a page may hold fewer than `max_keys` items while
    /// `has_more` is still true.
    pub async fn list_page(
        &self,
        token: Option<String>,
        max_keys: usize,
    ) -> GatewayResult<ListingPage> {
        let token = token.filter(|t| !t.is_empty());
        let max_keys = max_keys.clamp(1, MAX_PAGE_SIZE);

        let chunk = self.storage.list(&self.folder, token, max_keys).await?;
        let items = chunk
            .keys
            .iter()
            .filter_map(|key| self.entry_for(key))
            .collect();

        Ok(ListingPage::new(items, chunk.next_token))
    }

    /// Store `body` under the sanitized `filename`, overwriting any
    /// existing object with the same name.
    pub async fn upload(
        &self,
        filename: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> GatewayResult<StoredFile> {
        let name = self.safe_name(filename)?;
        let key = self.key_for(&name);
        let size = body.len();

        self.storage.put(&key, body, content_type).await?;

        let stored = StoredFile {
            url: self.public_url_for(&key),
            name,
            key,
        };
        info!(key = %stored.key, name = %stored.name, size, "upload complete: {}", stored.url);
        Ok(stored)
    }

    /// Delete `filename` from the folder. Deleting a file that does not
    /// exist succeeds.
    ///
    /// Only names already in sanitized form are accepted; anything the
    /// sanitizer would rewrite is rejected rather than mapped onto another key.
    pub async fn delete(&self, filename: &str) -> GatewayResult<String> {
        if filename.trim().is_empty() {
            return Err(GatewayError::MissingFilename);
        }
        let name = self.canonical_name(filename)?;
        let key = self.key_for(&name);

        self.storage.delete(&key).await?;

        info!(key = %key, "file deleted");
        Ok(name)
    }

    /// Cheapest backend round trip that proves the folder is listable.
    pub async fn check_ready(&self) -> GatewayResult<()> {
        self.storage.list(&self.folder, None, 1).await?;
        Ok(())
    }

    fn safe_name(&self, filename: &str) -> GatewayResult<String> {
        secure_filename(filename).ok_or_else(|| GatewayError::InvalidFilename(filename.to_string()))
    }

    fn canonical_name(&self, filename: &str) -> GatewayResult<String> {
        match secure_filename(filename) {
            Some(name) if name == filename => Ok(name),
            _ => Err(GatewayError::InvalidFilename(filename.to_string())),
        }
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.folder, name)
    }

    fn public_url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Only direct children of the folder are listed; markers and anything
    /// in a subfolder are skipped so `url` is always `public_url/folder/name`.
    fn entry_for(&self, key: &str) -> Option<ObjectEntry> {
        let name = key.strip_prefix(self.folder.as_str())?;
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(ObjectEntry {
            name: name.to_string(),
            url: self.public_url_for(key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_storage::MemoryStorage;
    use std::collections::BTreeSet;

    const PUBLIC: &str = "https://pub.example.dev";

    fn service_with(storage: Arc<MemoryStorage>) -> GatewayService {
        GatewayService::new(storage, "imagens/", PUBLIC)
    }

    fn seeded() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::with_keys(["imagens/", "imagens/a.png", "imagens/b.png"]))
    }

    #[tokio::test]
    async fn lists_in_pages_following_backend_tokens() {
        let service = service_with(seeded());

        // "imagens/" sorts first and is filtered out of the first page.
        let first = service.list_page(None, 2).await.unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].name, "a.png");
        assert_eq!(first.items[0].url, "https://pub.example.dev/imagens/a.png");
        assert!(first.has_more);

        let second = service.list_page(first.next_token.clone(), 2).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "b.png");
        assert_eq!(second.next_token, None);
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn concatenated_pages_reproduce_the_folder() {
        let keys: Vec<String> = (0..23).map(|i| format!("imagens/file-{i:02}.txt")).collect();
        let storage = Arc::new(MemoryStorage::with_keys(keys.iter().map(String::as_str)));
        storage.insert("imagens/", Bytes::new());
        storage.insert("outros/ignored.txt", Bytes::new());
        let service = service_with(storage);

        let mut token = None;
        let mut seen = Vec::new();
        loop {
            let page = service.list_page(token, 4).await.unwrap();
            assert!(page.items.len() <= 4);
            assert_eq!(page.has_more, page.next_token.is_some());
            seen.extend(page.items.into_iter().map(|entry| entry.name));
            if !page.has_more {
                break;
            }
            token = page.next_token;
        }

        let unique: BTreeSet<_> = seen.iter().cloned().collect();
        assert_eq!(unique.len(), seen.len(), "duplicate entries across pages");
        let expected: Vec<String> = (0..23).map(|i| format!("file-{i:02}.txt")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn empty_folder_yields_empty_last_page() {
        let service = service_with(Arc::new(MemoryStorage::new()));
        let page = service.list_page(None, DEFAULT_PAGE_SIZE).await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.next_token, None);
    }

    #[tokio::test]
    async fn only_direct_children_are_listed() {
        let storage = Arc::new(MemoryStorage::with_keys([
            "imagens/",
            "imagens/sub/",
            "imagens/sub/c.png",
            "imagens/z.png",
        ]));
        let service = service_with(storage);
        let page = service.list_page(None, 10).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z.png"]);
        for entry in &page.items {
            assert_eq!(entry.url, format!("{PUBLIC}/imagens/{}", entry.name));
        }
    }

    #[tokio::test]
    async fn listed_names_delete_their_own_key() {
        let storage = Arc::new(MemoryStorage::with_keys([
            "imagens/sub/c.png",
            "imagens/c.png",
            "imagens/d.png",
        ]));
        let service = service_with(storage.clone());
        let page = service.list_page(None, 10).await.unwrap();
        for entry in &page.items {
            service.delete(&entry.name).await.unwrap();
        }
        assert_eq!(
            storage.deleted_keys(),
            vec!["imagens/c.png".to_string(), "imagens/d.png".to_string()]
        );
        assert_eq!(storage.keys(), vec!["imagens/sub/c.png".to_string()]);
    }

    #[tokio::test]
    async fn empty_token_means_first_page() {
        let service = service_with(seeded());
        let page = service.list_page(Some(String::new()), 10).await.unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let storage = seeded();
        let service = service_with(storage.clone());
        service.list_page(None, 0).await.unwrap();
        service.list_page(None, 50_000).await.unwrap();
        assert_eq!(storage.requested_page_sizes(), vec![1, MAX_PAGE_SIZE]);
    }

    #[tokio::test]
    async fn upload_then_list_round_trips_and_overwrites() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone());

        let stored = service
            .upload("X.png", Bytes::from_static(b"one"), Some("image/png".into()))
            .await
            .unwrap();
        assert_eq!(stored.key, "imagens/X.png");
        assert_eq!(stored.url, "https://pub.example.dev/imagens/X.png");

        service
            .upload("X.png", Bytes::from_static(b"two"), None)
            .await
            .unwrap();

        let page = service.list_page(None, 10).await.unwrap();
        let named_x: Vec<_> = page.items.iter().filter(|e| e.name == "X.png").collect();
        assert_eq!(named_x.len(), 1);
        assert_eq!(storage.body("imagens/X.png").as_deref(), Some(&b"two"[..]));
        assert_eq!(storage.content_type("imagens/X.png"), None);
    }

    #[tokio::test]
    async fn upload_sanitizes_into_the_folder() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone());
        let stored = service
            .upload("../../secrets.txt", Bytes::from_static(b"x"), None)
            .await
            .unwrap();
        assert_eq!(stored.key, "imagens/secrets.txt");
        assert_eq!(storage.keys(), vec!["imagens/secrets.txt".to_string()]);
    }

    #[tokio::test]
    async fn upload_with_unusable_name_never_reaches_backend() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone());
        let err = service
            .upload("../..", Bytes::from_static(b"x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidFilename(_)));
        assert_eq!(storage.calls(), 0);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = seeded();
        let service = service_with(storage.clone());
        assert_eq!(service.delete("a.png").await.unwrap(), "a.png");
        assert_eq!(service.delete("a.png").await.unwrap(), "a.png");
        assert!(!storage.keys().contains(&"imagens/a.png".to_string()));
    }

    #[tokio::test]
    async fn delete_cannot_escape_the_folder() {
        let storage = Arc::new(MemoryStorage::with_keys(["outros/keep.txt", "imagens/keep.txt"]));
        let service = service_with(storage.clone());
        let err = service.delete("../outros/keep.txt").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidFilename(_)));
        assert_eq!(storage.calls(), 0);
        assert_eq!(
            storage.keys(),
            vec!["imagens/keep.txt".to_string(), "outros/keep.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn delete_rejects_names_the_sanitizer_would_rewrite() {
        let storage = Arc::new(MemoryStorage::with_keys([
            "imagens/my photo.png",
            "imagens/my_photo.png",
        ]));
        let service = service_with(storage.clone());
        let err = service.delete("my photo.png").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidFilename(_)));
        assert_eq!(storage.calls(), 0);
        assert_eq!(
            storage.keys(),
            vec!["imagens/my photo.png".to_string(), "imagens/my_photo.png".to_string()]
        );
    }

    #[tokio::test]
    async fn delete_with_blank_name_never_reaches_backend() {
        let storage = seeded();
        let service = service_with(storage.clone());
        let err = service.delete("  ").await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingFilename));
        assert_eq!(storage.calls(), 0);
    }

    #[tokio::test]
    async fn backend_failures_surface_as_storage_errors() {
        let storage = seeded();
        storage.fail_all(true);
        let service = service_with(storage);
        assert!(matches!(
            service.list_page(None, 10).await,
            Err(GatewayError::Storage(_))
        ));
        assert!(matches!(
            service.upload("a.png", Bytes::new(), None).await,
            Err(GatewayError::Storage(_))
        ));
        assert!(matches!(
            service.delete("a.png").await,
            Err(GatewayError::Storage(_))
        ));
        assert!(service.check_ready().await.is_err());
    }

    #[tokio::test]
    async fn bucket_root_folder_lists_top_level_keys() {
        let storage = Arc::new(MemoryStorage::with_keys(["a.txt", "dir/", "dir/b.txt"]));
        let service = GatewayService::new(storage, "", PUBLIC);
        let page = service.list_page(None, 10).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);
        assert_eq!(page.items[0].url, "https://pub.example.dev/a.txt");
    }
}
