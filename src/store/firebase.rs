//! Firebase Realtime Database adapter.
//!
//! Talks to the database through its REST API: every path maps to
//! `{base_url}/{path}.json`. When an auth token (legacy database secret or
//! OAuth access token) is configured it is sent as the `auth` query parameter.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{path_segments, DocumentStore};
use crate::error::StoreError;

/// Body returned by `POST` on a collection.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Document store backed by the Firebase Realtime Database REST API.
#[derive(Clone)]
pub struct FirebaseStore {
    client: Client,
    base_url: Url,
    auth: Option<String>,
}

impl FirebaseStore {
    /// Create a store for the database at `base_url`
    /// (e.g. `https://my-project-default-rtdb.firebaseio.com`).
    pub fn new(
        client: Client,
        base_url: &str,
        auth: Option<String>,
    ) -> Result<Self, StoreError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| StoreError::InvalidPath(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// The database root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the REST URL for a store path.
    pub fn url_for(&self, path: &str) -> Result<Url, StoreError> {
        let segments = path_segments(path)?;
        let relative = format!("{}.json", segments.join("/"));
        self.base_url
            .join(&relative)
            .map_err(|e| StoreError::InvalidPath(e.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth {
            Some(token) => builder.query(&[("auth", token.as_str())]),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| extract_error(&body))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull the `error` field out of a REST error body.
fn extract_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

#[async_trait]
impl DocumentStore for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let url = self.url_for(path)?;
        debug!(path = path, "store get");
        let response = self.send(self.request(Method::GET, url)).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let url = self.url_for(path)?;
        debug!(path = path, "store push");
        let response = self
            .send(self.request(Method::POST, url).json(&value))
            .await?;
        let pushed: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(pushed.name)
    }

    async fn list(&self, path: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let mut children: Vec<(String, Value)> = match self.get(path).await? {
            Some(Value::Object(map)) => map.into_iter().collect(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        };
        // Push keys are chronological, so key order is insertion order.
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(children)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let url = self.url_for(path)?;
        debug!(path = path, "store remove");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
