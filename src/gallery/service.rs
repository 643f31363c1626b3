//! Gallery service orchestrating uploads, listing and deletion.
//!
//! # Upload pipeline
//!
//! ```text
//! files ──► validate all ──► host uploads (bounded) ──► push records ──► entries
//!                │                    │                      │
//!                ▼                    ▼                      ▼
//!            400 error        any failure: destroy     any failure: remove
//!                             batch assets, 500        pushed records and
//!                                                      batch assets, 500
//! ```
//!
//! A batch either commits every file or none of them. Entries come back in
//! the order the files were submitted.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::{GalleryError, HostError};
use crate::host::{AssetHost, DestroyOutcome, HostedAsset, ImageUpload};
use crate::store::{is_valid_key, DocumentStore, GalleryEntry, GalleryRecord, GalleryStore};

use super::policy::UploadPolicy;

/// Default destination folder at the asset host.
pub const DEFAULT_UPLOAD_FOLDER: &str = "gallery";

/// Default number of host uploads in flight per request.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Service for the gallery workflows.
///
/// # Type Parameters
///
/// * `D` - The document store holding gallery records
/// * `H` - The asset host holding image bytes
pub struct GalleryService<D, H> {
    gallery: GalleryStore<D>,
    host: Arc<H>,
    policy: UploadPolicy,
    folder: String,
    concurrency: usize,
}

impl<D, H> Clone for GalleryService<D, H> {
    fn clone(&self) -> Self {
        Self {
            gallery: self.gallery.clone(),
            host: Arc::clone(&self.host),
            policy: self.policy,
            folder: self.folder.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl<D: DocumentStore, H: AssetHost> GalleryService<D, H> {
    /// Create a service with the default policy, folder and concurrency.
    pub fn new(gallery: GalleryStore<D>, host: Arc<H>) -> Self {
        Self {
            gallery,
            host,
            policy: UploadPolicy::default(),
            folder: DEFAULT_UPLOAD_FOLDER.to_string(),
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Set the number of concurrent host uploads (clamped to at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn gallery(&self) -> &GalleryStore<D> {
        &self.gallery
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Upload a batch into the default folder.
    pub async fn upload(&self, files: Vec<ImageUpload>) -> Result<Vec<GalleryEntry>, GalleryError> {
        let folder = self.folder.clone();
        self.upload_to(&folder, files).await
    }

    /// Upload a batch into `folder`.
    pub async fn upload_to(
        &self,
        folder: &str,
        files: Vec<ImageUpload>,
    ) -> Result<Vec<GalleryEntry>, GalleryError> {
        self.policy.check_all(&files)?;

        let total = files.len();
        debug!(
            files = total,
            folder = folder,
            host = self.host.name(),
            "starting upload batch"
        );

        let results = self.upload_assets(folder, &files).await;

        let mut assets: Vec<HostedAsset> = Vec::with_capacity(total);
        let mut failures: Vec<(String, HostError)> = Vec::new();
        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(asset) => assets.push(asset),
                Err(e) => failures.push((file.filename.clone(), e)),
            }
        }

        if let Some((filename, first)) = failures.first() {
            for (filename, e) in &failures {
                warn!(filename = %filename, error = %e, "host upload failed");
            }
            self.discard_assets(&assets).await;
            return Err(GalleryError::UpstreamUploadFailure {
                failed: failures.len(),
                total,
                message: format!("{}: {}", filename, first),
            });
        }

        let mut entries: Vec<GalleryEntry> = Vec::with_capacity(total);
        for asset in &assets {
            let record = GalleryRecord {
                url: asset.secure_url.clone(),
                public_id: asset.public_id.clone(),
            };
            match self.gallery.push(record).await {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    error!(error = %e, "failed to persist gallery record, rolling back batch");
                    for entry in &entries {
                        if let Err(e) = self.gallery.remove(&entry.key).await {
                            error!(key = %entry.key, error = %e, "rollback left orphaned record");
                        }
                    }
                    self.discard_assets(&assets).await;
                    return Err(GalleryError::Store(e));
                }
            }
        }

        info!(files = total, folder = folder, "upload batch committed");
        Ok(entries)
    }

    /// Run host uploads with at most `concurrency` in flight. Results line
    /// up with `files`.
    async fn upload_assets(
        &self,
        folder: &str,
        files: &[ImageUpload],
    ) -> Vec<Result<HostedAsset, HostError>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let uploads = files.iter().map(|file| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| HostError::Connection(e.to_string()))?;
                self.host.upload(folder, file).await
            }
        });

        join_all(uploads).await
    }

    /// Best-effort removal of assets from a batch that will not be committed.
    async fn discard_assets(&self, assets: &[HostedAsset]) {
        for asset in assets {
            match self.host.destroy(&asset.public_id).await {
                Ok(DestroyOutcome::Deleted) | Ok(DestroyOutcome::NotFound) => {
                    debug!(public_id = %asset.public_id, "discarded uncommitted asset");
                }
                Ok(DestroyOutcome::Rejected(reason)) => {
                    error!(public_id = %asset.public_id, reason = %reason, "orphaned asset at host");
                }
                Err(e) => {
                    error!(public_id = %asset.public_id, error = %e, "orphaned asset at host");
                }
            }
        }
    }

    /// All gallery entries, newest first.
    pub async fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        Ok(self.gallery.list_all().await?)
    }

    /// Delete the asset at the host, then its record.
    ///
    /// `public_id` must be the one stored under `key`; a key with no record
    /// is a no-op and nothing is destroyed. The record is only removed once
    /// the host confirms the deletion.
    pub async fn delete(
        &self,
        key: Option<&str>,
        public_id: Option<&str>,
    ) -> Result<(), GalleryError> {
        let key = key.map(str::trim).filter(|k| !k.is_empty());
        let public_id = public_id.map(str::trim).filter(|p| !p.is_empty());

        let (key, public_id) = match (key, public_id) {
            (Some(key), Some(public_id)) => (key, public_id),
            (None, Some(_)) => return Err(GalleryError::MissingParameters("key".to_string())),
            (Some(_), None) => {
                return Err(GalleryError::MissingParameters("public_id".to_string()))
            }
            (None, None) => {
                return Err(GalleryError::MissingParameters(
                    "key, public_id".to_string(),
                ))
            }
        };

        if !is_valid_key(key) {
            return Err(GalleryError::InvalidRequest(format!("Invalid key '{}'", key)));
        }

        let Some(record) = self.gallery.get(key).await? else {
            debug!(key = %key, "no gallery record under key; nothing to delete");
            return Ok(());
        };

        if record.public_id != public_id {
            warn!(
                key = %key,
                public_id = %public_id,
                stored = %record.public_id,
                "delete refused: public id does not match the record"
            );
            return Err(GalleryError::InvalidRequest(format!(
                "public_id '{}' does not belong to entry '{}'",
                public_id, key
            )));
        }

        let reason = match self.host.destroy(public_id).await {
            Ok(DestroyOutcome::Deleted) => None,
            Ok(DestroyOutcome::NotFound) => Some("asset not found at host".to_string()),
            Ok(DestroyOutcome::Rejected(reason)) => Some(reason),
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = reason {
            warn!(
                key = %key,
                public_id = %public_id,
                reason = %reason,
                "host did not confirm deletion; record kept for reconciliation"
            );
            return Err(GalleryError::RemoteDeleteFailed {
                public_id: public_id.to_string(),
                reason,
            });
        }

        self.gallery.remove(key).await?;
        info!(key = %key, public_id = %public_id, "gallery entry deleted");
        Ok(())
    }
}
