//! HTTP adapter for the object store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use thiserror::Error;
use tracing::debug;

use crate::application::store::ObjectStore;
use crate::domain::storage::StorageLayout;

const SOURCE: &str = "mediaward::infra::storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to `{url}` failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Shared HTTP client with the crate's user agent and a request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, StoreError> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .build()
        .map_err(StoreError::Client)
}

pub fn user_agent() -> &'static str {
    concat!("mediaward/", env!("CARGO_PKG_VERSION"))
}

/// Object store reached over plain HTTP(S).
pub struct HttpObjectStore {
    client: Client,
    layout: Arc<StorageLayout>,
}

impl HttpObjectStore {
    pub fn new(client: Client, layout: Arc<StorageLayout>) -> Self {
        Self { client, layout }
    }

    pub fn layout(&self) -> &Arc<StorageLayout> {
        &self.layout
    }

    /// Status of a HEAD request, retried as a one-byte ranged GET when the
    /// server refuses HEAD.
    pub async fn status_of(&self, url: &str) -> Result<StatusCode, StoreError> {
        let status = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|source| request_error(url, source))?
            .status();

        if status != StatusCode::METHOD_NOT_ALLOWED && status != StatusCode::NOT_IMPLEMENTED {
            return Ok(status);
        }

        debug!(target = SOURCE, url, %status, "HEAD refused; falling back to ranged GET");
        let response = self
            .client
            .get(url)
            .header(header::RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(|source| request_error(url, source))?;
        Ok(response.status())
    }
}

fn request_error(url: &str, source: reqwest::Error) -> StoreError {
    StoreError::Request {
        url: url.to_string(),
        source,
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn public_url(&self, path: &str) -> String {
        let address = self.layout.address_for_key(path);
        self.layout.public_url(&address)
    }

    async fn head_or_probe(&self, url: &str) -> bool {
        match self.status_of(url).await {
            Ok(status) => status.is_success(),
            Err(err) => {
                debug!(target = SOURCE, url, error = %err, "existence check failed");
                false
            }
        }
    }
}
