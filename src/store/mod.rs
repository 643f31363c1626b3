//! Document store layer.
//!
//! The gallery keeps two kinds of state in a hosted realtime document store:
//!
//! ```text
//! login                      - {email, password} singleton (read-only here)
//! galleryImages/{push key}   - {url, public_id} per uploaded image
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │   CredentialStore    │   │     GalleryStore     │
//! │  (login singleton)   │   │ (galleryImages/...)  │
//! └──────────┬───────────┘   └──────────┬───────────┘
//!            └─────────────┬────────────┘
//!                          ▼
//! ┌─────────────────────────────────────────────────┐
//! │              DocumentStore trait                │
//! └──────────────┬─────────────────────┬────────────┘
//!                ▼                     ▼
//!      ┌─────────────────┐   ┌──────────────────┐
//!      │ FirebaseStore   │   │   MemoryStore    │
//!      │ (REST over TLS) │   │ (in-process)     │
//!      └─────────────────┘   └──────────────────┘
//! ```

mod credentials;
mod firebase;
mod gallery;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use credentials::{coerce_to_string, CredentialRecord, CredentialStore, LOGIN_PATH};
pub use firebase::FirebaseStore;
pub use gallery::{is_valid_key, GalleryEntry, GalleryRecord, GalleryStore, GALLERY_PATH};
pub use memory::{push_key, MemoryStore};

/// Minimal tree-shaped key-value store used by the adapters.
///
/// Paths are `/`-separated segments relative to the store root
/// (e.g. `galleryImages/-Nx3...`). Implementations must be safe to share
/// across request handlers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value at `path`, or `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Append `value` under a freshly generated child key of `path`.
    ///
    /// Returns the generated key. Keys generated by one store sort in
    /// creation order.
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError>;

    /// List the direct children of `path` as `(key, value)` pairs in the
    /// order the store returns them.
    async fn list(&self, path: &str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Remove the value at `path`. Removing a missing path succeeds.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;
}

/// Split a store path into its non-empty segments, rejecting characters the
/// realtime database forbids in keys.
pub(crate) fn path_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    for segment in &segments {
        if segment
            .chars()
            .any(|c| matches!(c, '.' | '#' | '$' | '[' | ']') || c.is_control())
        {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
    }
    Ok(segments)
}
