use std::time::Duration;

use reqwest::{Client, Url, header::ACCEPT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod api;
pub use api::*;

/// Uniform failure shape for every backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend answered with status {0}")]
    Http(u16),
    #[error("Could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http(status.as_u16())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Thin GET-only client for the backend.
///
/// Holds no state besides the connection pool, so clones are cheap and can be
/// moved into poller fetch closures. Retrying is left to callers.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Gateway {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves `path` against the base url and appends `query`.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, TransportError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let url = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query.iter().map(|(key, value)| (*key, value.as_str())))
        };
        url.map_err(|err| TransportError::Network(format!("Invalid url {raw}: {err}")))
    }

    /// Raw JSON request.
    pub async fn request(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        self.get(path, query).await
    }

    pub async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path, query)?;
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                let err = TransportError::from(err);
                warn!("Request to {url} failed: {err}");
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Request to {url} answered {status}");
            return Err(TransportError::Http(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| {
            warn!("Failed to decode body from {url}: {err}");
            TransportError::from(err)
        })
    }
}
