//! Gallery metadata records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::DocumentStore;
use crate::error::StoreError;

/// Store path of the gallery collection.
pub const GALLERY_PATH: &str = "galleryImages";

/// What is persisted per image: `galleryImages/{key} -> {url, public_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub url: String,
    pub public_id: String,
}

/// A gallery record together with its store-generated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub key: String,
    pub url: String,
    pub public_id: String,
}

impl GalleryEntry {
    pub fn new(key: impl Into<String>, record: GalleryRecord) -> Self {
        Self {
            key: key.into(),
            url: record.url,
            public_id: record.public_id,
        }
    }
}

/// Longest child key the realtime database accepts, in bytes.
const MAX_KEY_BYTES: usize = 768;

/// Whether `key` addresses exactly one direct child of the collection.
///
/// Keys may not contain `/` or the characters the database reserves, so a
/// crafted key can never reach the collection itself or a nested path.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_BYTES
        && !key
            .chars()
            .any(|c| matches!(c, '/' | '.' | '#' | '$' | '[' | ']') || c.is_control())
}

/// CRUD adapter over the gallery collection.
pub struct GalleryStore<D> {
    store: Arc<D>,
    path: String,
}

impl<D> Clone for GalleryStore<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            path: self.path.clone(),
        }
    }
}

impl<D: DocumentStore> GalleryStore<D> {
    /// Create an adapter over the default `galleryImages` collection.
    pub fn new(store: Arc<D>) -> Self {
        Self::with_path(store, GALLERY_PATH)
    }

    /// Create an adapter over a custom collection path.
    pub fn with_path(store: Arc<D>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// The underlying document store.
    pub fn store(&self) -> &Arc<D> {
        &self.store
    }

    /// Persist a record under a newly generated key.
    pub async fn push(&self, record: GalleryRecord) -> Result<GalleryEntry, StoreError> {
        let value =
            serde_json::to_value(&record).map_err(|e| StoreError::Decode(e.to_string()))?;
        let key = self.store.push(&self.path, value).await?;
        Ok(GalleryEntry::new(key, record))
    }

    /// All entries, newest first.
    ///
    /// This is the reverse of the order the store returns, nothing more:
    /// entries are not re-sorted.
    pub async fn list_all(&self) -> Result<Vec<GalleryEntry>, StoreError> {
        let children = self.store.list(&self.path).await?;
        let mut entries: Vec<GalleryEntry> = children
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value::<GalleryRecord>(value) {
                Ok(record) => Some(GalleryEntry::new(key, record)),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping malformed gallery record");
                    None
                }
            })
            .collect();
        entries.reverse();
        Ok(entries)
    }

    /// The record stored under `key`, or `None` when there is none.
    pub async fn get(&self, key: &str) -> Result<Option<GalleryRecord>, StoreError> {
        let path = self.child_path(key)?;
        match self.store.get(&path).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("{}: {}", path, e))),
            None => Ok(None),
        }
    }

    /// Remove the record stored under `key`. Missing keys are not an error.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.child_path(key)?;
        self.store.remove(&path).await
    }

    fn child_path(&self, key: &str) -> Result<String, StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidPath(key.to_string()));
        }
        Ok(format!("{}/{}", self.path, key))
    }
}
