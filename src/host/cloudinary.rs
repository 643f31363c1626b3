//! Cloudinary asset host.
//!
//! Uses the signed upload API: every request carries `api_key`, a Unix
//! `timestamp` and a SHA-256 `signature` over the sorted parameters followed
//! by the API secret:
//!
//! ```text
//! signature = hex(SHA-256("folder=gallery&timestamp=1700000000" + api_secret))
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{AssetHost, DestroyOutcome, HostedAsset, ImageUpload};
use crate::error::HostError;

/// Default API root.
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Account settings for the Cloudinary API.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.api_base.trim_end_matches('/'),
            self.cloud_name,
            action
        )
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Asset host backed by Cloudinary.
#[derive(Clone)]
pub struct CloudinaryHost {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryHost {
    pub fn new(client: Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    /// Compute the request signature for `params` (excluding file, api_key
    /// and signature fields).
    pub fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let canonical = sorted
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn timestamp() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            .to_string()
    }

    async fn check(response: Response) -> Result<Response, HostError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(HostError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AssetHost for CloudinaryHost {
    async fn upload(&self, folder: &str, file: &ImageUpload) -> Result<HostedAsset, HostError> {
        let timestamp = Self::timestamp();
        let mut signed: Vec<(&str, &str)> = vec![("timestamp", timestamp.as_str())];
        if !folder.is_empty() {
            signed.push(("folder", folder));
        }
        let signature = self.sign(&signed);

        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| HostError::Decode(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        if !folder.is_empty() {
            form = form.text("folder", folder.to_string());
        }

        debug!(folder = folder, size = file.len(), "uploading to cloudinary");
        let response = self
            .client
            .post(self.config.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| HostError::Connection(e.to_string()))?;

        let uploaded: UploadResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))?;

        Ok(HostedAsset {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, HostError> {
        let timestamp = Self::timestamp();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .client
            .post(self.config.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| HostError::Connection(e.to_string()))?;

        let destroyed: DestroyResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))?;

        Ok(destroy_outcome(&destroyed.result))
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}

fn destroy_outcome(result: &str) -> DestroyOutcome {
    match result {
        "ok" => DestroyOutcome::Deleted,
        "not found" => DestroyOutcome::NotFound,
        other => DestroyOutcome::Rejected(other.to_string()),
    }
}
