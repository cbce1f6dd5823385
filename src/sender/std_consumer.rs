use super::client::{ClientConfig, ClientError, HttpClient, Transport};
use super::error::DeliveryError;
use super::metrics::{DeliveryMetrics, MetricsCollector};
use super::response::classify_response;
use super::Consumer;
use crate::domain::EndpointMap;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Sends every message in its own request, synchronously with the caller.
#[derive(Clone)]
pub struct StdConsumer {
    endpoints: Arc<EndpointMap>,
    transport: Arc<dyn Transport>,
    metrics: MetricsCollector,
}

impl StdConsumer {
    pub fn new(endpoints: EndpointMap, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            transport,
            metrics: MetricsCollector::new(),
        }
    }

    /// Builds a consumer backed by a pooled reqwest client.
    pub fn with_client_config(
        endpoints: EndpointMap,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let client = HttpClient::new(config)?;
        Ok(Self::new(endpoints, Arc::new(client)))
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    pub fn metrics(&self) -> DeliveryMetrics {
        self.metrics.snapshot()
    }

    pub(crate) fn metrics_collector(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub(crate) fn unknown_endpoint(&self, endpoint: &str) -> DeliveryError {
        DeliveryError::unknown_endpoint(endpoint, self.endpoints.names())
    }

    /// Target URL carrying `message` as the `data` query parameter.
    pub fn request_url(target: &Url, message: &[u8]) -> Url {
        let mut url = target.clone();
        url.query_pairs_mut()
            .append_pair("data", &URL_SAFE_NO_PAD.encode(message))
            .append_pair("verbose", "1");
        url
    }

    async fn write(&self, endpoint: &str, target: &Url, message: &[u8]) -> Result<(), DeliveryError> {
        let url = Self::request_url(target, message);
        let start = Instant::now();

        let result = match self.transport.get(url).await {
            Ok(response) => {
                debug!(
                    endpoint,
                    status = response.status,
                    body_len = response.body.len(),
                    "Received ingestion response"
                );
                classify_response(&response.body)
            }
            Err(e) => Err(DeliveryError::Transport(e)),
        };

        let latency = start.elapsed();
        self.metrics.record_request(
            result.as_ref().err().map(DeliveryError::kind),
            message.len(),
            latency,
        );

        match &result {
            Ok(()) => debug!(endpoint, bytes = message.len(), ?latency, "Delivered message"),
            Err(e) => warn!(endpoint, bytes = message.len(), ?latency, "Delivery failed: {}", e),
        }

        result
    }
}

#[async_trait]
impl Consumer for StdConsumer {
    async fn send(&self, endpoint: &str, message: Bytes) -> Result<(), DeliveryError> {
        let Some(target) = self.endpoints.get(endpoint) else {
            return Err(self.unknown_endpoint(endpoint));
        };
        self.write(endpoint, target, &message).await
    }
}

impl std::fmt::Debug for StdConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdConsumer")
            .field("endpoints", &self.endpoints)
            .field("metrics", &self.metrics)
            .finish()
    }
}
