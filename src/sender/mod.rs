pub mod client;
pub mod error;
pub mod metrics;
pub mod response;
pub mod std_consumer;

pub use client::{ClientConfig, ClientError, HttpClient, Transport, TransportResponse};
pub use error::{DeliveryError, DeliveryErrorKind, FlushFailure, TransportError};
pub use metrics::{DeliveryMetrics, MetricsCollector};
pub use response::classify_response;
pub use std_consumer::StdConsumer;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Something that can deliver an already-serialized message to a named
/// endpoint.
///
/// Implementations may defer network I/O: a buffering consumer only talks to
/// the network when a flush happens.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn send(&self, endpoint: &str, message: Bytes) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<C: Consumer + ?Sized> Consumer for Arc<C> {
    async fn send(&self, endpoint: &str, message: Bytes) -> Result<(), DeliveryError> {
        (**self).send(endpoint, message).await
    }
}
