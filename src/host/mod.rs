//! External asset host layer.
//!
//! Images are stored at a third-party host; the gallery only keeps the
//! returned URL and asset id. Three hosts are provided:
//!
//! - [`S3AssetHost`] - S3 or any S3-compatible object store
//! - [`CloudinaryHost`] - Cloudinary's signed upload API
//! - [`MemoryAssetHost`] - in-process map for development and tests

mod cloudinary;
mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::HostError;

pub use cloudinary::{CloudinaryConfig, CloudinaryHost};
pub use memory::MemoryAssetHost;
pub use s3::{create_s3_client, S3AssetHost};

/// One file received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-supplied file name (may be empty)
    pub filename: String,

    /// Declared MIME type
    pub content_type: String,

    /// Raw file content
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lower-cased file extension including the dot, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty()
            || ext.is_empty()
            || ext.len() > 8
            || !ext.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// Reference returned by the host after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedAsset {
    /// HTTPS URL the image is served from
    pub secure_url: String,

    /// Host-side identifier used to delete the asset later
    pub public_id: String,
}

/// Result of asking the host to delete an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The asset existed and is gone
    Deleted,

    /// The host has no asset with that id
    NotFound,

    /// The host answered but did not delete the asset
    Rejected(String),
}

impl DestroyOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DestroyOutcome::Deleted)
    }
}

/// Third-party media storage.
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Store `file` under `folder` and return where it can be fetched.
    async fn upload(&self, folder: &str, file: &ImageUpload) -> Result<HostedAsset, HostError>;

    /// Delete the asset with the given id.
    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, HostError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
