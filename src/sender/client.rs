use super::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
    pub enable_compression: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connection_timeout: Duration::from_secs(5),
            max_connections: 10,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: format!("mixpanel-sender/{}", env!("CARGO_PKG_VERSION")),
            enable_compression: false,
        }
    }
}

/// A finished HTTP response: status code and the complete body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// HTTP GET capability used by [`StdConsumer`](super::StdConsumer).
///
/// Any deadline is the implementation's business; callers never retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: Url) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed [`Transport`] with connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.timeout.is_zero() || config.connection_timeout.is_zero() {
            return Err(ClientError::InvalidConfiguration(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent)
            // The gzip feature turns decompression on unless told otherwise.
            .gzip(config.enable_compression)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: Url) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: Url) -> Result<TransportResponse, TransportError> {
        let start = Instant::now();
        let host = url.host_str().unwrap_or_default().to_string();

        let result = self.fetch(url).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => debug!(
                "GET {} completed with HTTP {} in {:?}",
                host, response.status, elapsed
            ),
            Err(e) => debug!("GET {} failed after {:?}: {}", host, elapsed, e),
        }

        result
    }
}
