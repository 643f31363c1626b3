use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{AssetHost, DestroyOutcome, HostedAsset, ImageUpload};
use crate::error::HostError;

/// Asset host that keeps uploads in memory.
///
/// Ids are `{folder}/asset-{n}{ext}` with `n` counting up from 1; URLs use
/// the configured base (default `memory://assets`).
pub struct MemoryAssetHost {
    base_url: String,
    assets: RwLock<HashMap<String, Bytes>>,
    counter: AtomicU64,
}

impl MemoryAssetHost {
    pub fn new() -> Self {
        Self::with_base_url("memory://assets")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            assets: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Whether an asset with this id is currently stored.
    pub async fn contains(&self, public_id: &str) -> bool {
        self.assets.read().await.contains_key(public_id)
    }

    /// Number of stored assets.
    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }

    /// Content of a stored asset.
    pub async fn get(&self, public_id: &str) -> Option<Bytes> {
        self.assets.read().await.get(public_id).cloned()
    }
}

impl Default for MemoryAssetHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetHost for MemoryAssetHost {
    async fn upload(&self, folder: &str, file: &ImageUpload) -> Result<HostedAsset, HostError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("asset-{}{}", n, file.extension().unwrap_or_default());
        let folder = folder.trim_matches('/');
        let public_id = if folder.is_empty() {
            name
        } else {
            format!("{}/{}", folder, name)
        };

        self.assets
            .write()
            .await
            .insert(public_id.clone(), file.data.clone());

        Ok(HostedAsset {
            secure_url: format!("{}/{}", self.base_url, public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, HostError> {
        match self.assets.write().await.remove(public_id) {
            Some(_) => Ok(DestroyOutcome::Deleted),
            None => Ok(DestroyOutcome::NotFound),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
