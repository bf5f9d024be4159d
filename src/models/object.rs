//! Represents files as the gateway exposes them to clients.

use serde::Serialize;

/// A single file within the gateway folder.
///
/// Derived from a backend key on every listing; nothing here is persisted.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Key with the folder prefix removed; never contains `/`.
    pub name: String,

    /// Public download URL (`public_base/folder/name`).
    pub url: String,
}

/// One page of a folder listing.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ListingPage {
    /// Entries in backend key order, directory markers removed.
    pub items: Vec<ObjectEntry>,

    /// Opaque backend cursor for the next page, `null` on the last page.
    pub next_token: Option<String>,

    /// True iff `next_token` is present.
    pub has_more: bool,
}

impl ListingPage {
    pub fn new(items: Vec<ObjectEntry>, next_token: Option<String>) -> Self {
        let next_token = next_token.filter(|token| !token.is_empty());
        Self {
            items,
            has_more: next_token.is_some(),
            next_token,
        }
    }
}

/// A file accepted by the gateway and written to the backend.
///
/// Internal result of an upload; handlers pick the fields they return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub key: String,
    pub url: String,
}
