use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use rand::RngCore;
use tracing::debug;

use super::{AssetHost, DestroyOutcome, HostedAsset, ImageUpload};
use crate::error::HostError;

/// S3-backed asset host.
///
/// Objects are written under `{folder}/{random id}{ext}`; the object key is
/// used as the asset's `public_id`, and the public URL is the configured
/// public base URL joined with the key.
#[derive(Clone)]
pub struct S3AssetHost {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3AssetHost {
    /// Create a host for `bucket`.
    ///
    /// `public_base_url` is where the bucket's objects are publicly reachable
    /// (CDN or website endpoint). When `None`, the virtual-hosted AWS URL for
    /// `region` is used.
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        region: &str,
        public_base_url: Option<String>,
    ) -> Self {
        let bucket = bucket.into();
        let public_base_url = public_base_url
            .unwrap_or_else(|| format!("https://{}.s3.{}.amazonaws.com", bucket, region))
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    fn object_key(folder: &str, file: &ImageUpload) -> String {
        let mut id = [0u8; 16];
        rand::rng().fill_bytes(&mut id);
        let name = format!("{}{}", hex::encode(id), file.extension().unwrap_or_default());
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            name
        } else {
            format!("{}/{}", folder, name)
        }
    }
}

#[async_trait]
impl AssetHost for S3AssetHost {
    async fn upload(&self, folder: &str, file: &ImageUpload) -> Result<HostedAsset, HostError> {
        let key = Self::object_key(folder, file);
        debug!(bucket = %self.bucket, key = %key, size = file.len(), "uploading object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&file.content_type)
            .body(ByteStream::from(file.data.clone()))
            .send()
            .await
            .map_err(|e| HostError::S3(e.to_string()))?;

        Ok(HostedAsset {
            secure_url: self.public_url(&key),
            public_id: key,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, HostError> {
        // DeleteObject succeeds for missing keys, so check first to be able
        // to report NotFound.
        if let Err(e) = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
        {
            let is_not_found = e
                .as_service_error()
                .map(|se| se.is_not_found())
                .unwrap_or(false);
            let status_is_404 = e
                .raw_response()
                .map(|r| r.status().as_u16() == 404)
                .unwrap_or(false);

            if is_not_found || status_is_404 {
                return Ok(DestroyOutcome::NotFound);
            }
            return Err(HostError::S3(e.to_string()));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .map_err(|e| HostError::S3(e.to_string()))?;

        Ok(DestroyOutcome::Deleted)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally want path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
