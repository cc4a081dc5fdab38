//! Remote posts API.
//!
//! [`PostsApi`] is the seam the store's remote operations are written
//! against. [`HttpPostsApi`] talks to a json-server style REST resource:
//! `GET /?_limit=&_start=`, `GET /{id}`, `POST /`, `PUT /{id}`, `DELETE /{id}`.

use async_trait::async_trait;
use std::time::Duration;

use crate::model::{Post, PostId, PostPatch, PostPayload};

/// Default posts resource.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/posts";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Remote API configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// URL of the posts collection, without a trailing slash
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, timeout }
    }

    pub fn collection_url(&self) -> &str {
        &self.base_url
    }

    pub fn item_url(&self, id: &PostId) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

/// Remote API errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("API config error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Pagination for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub limit: usize,
    pub offset: usize,
}

impl ListParams {
    pub fn first(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }

    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("_limit", self.limit.to_string()),
            ("_start", self.offset.to_string()),
        ]
    }
}

/// Remote posts resource.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn list(&self, params: ListParams) -> Result<Vec<Post>, ApiError>;

    async fn get(&self, id: &PostId) -> Result<Post, ApiError>;

    async fn create(&self, payload: &PostPayload) -> Result<Post, ApiError>;

    /// Send a partial update; returns the server's full representation.
    async fn update(&self, id: &PostId, patch: &PostPatch) -> Result<Post, ApiError>;

    /// Delete a post and echo back its id.
    async fn delete(&self, id: &PostId) -> Result<PostId, ApiError>;
}

/// `reqwest` implementation of [`PostsApi`].
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpPostsApi {
    config: ApiConfig,
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpPostsApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|body| !body.trim().is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn list(&self, params: ListParams) -> Result<Vec<Post>, ApiError> {
        tracing::debug!(limit = params.limit, offset = params.offset, "GET posts");
        let request = self
            .client
            .get(self.config.collection_url())
            .query(&params.query());
        self.json(request).await
    }

    async fn get(&self, id: &PostId) -> Result<Post, ApiError> {
        tracing::debug!(%id, "GET post");
        self.json(self.client.get(self.config.item_url(id))).await
    }

    async fn create(&self, payload: &PostPayload) -> Result<Post, ApiError> {
        tracing::debug!("POST post");
        let request = self.client.post(self.config.collection_url()).json(payload);
        self.json(request).await
    }

    async fn update(&self, id: &PostId, patch: &PostPatch) -> Result<Post, ApiError> {
        tracing::debug!(%id, "PUT post");
        let request = self.client.put(self.config.item_url(id)).json(patch);
        self.json(request).await
    }

    async fn delete(&self, id: &PostId) -> Result<PostId, ApiError> {
        tracing::debug!(%id, "DELETE post");
        self.send(self.client.delete(self.config.item_url(id)))
            .await?;
        Ok(id.clone())
    }
}
