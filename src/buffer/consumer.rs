use super::batch::Batch;
use super::endpoint_buffer::EndpointBuffer;
use super::error::BufferError;
use crate::sender::{Consumer, DeliveryError, FlushFailure, StdConsumer};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Buffers messages per endpoint and delivers them as JSON array batches.
///
/// A batch is flushed automatically once an endpoint holds more than
/// `max_size` messages. Delivery is at-most-once: a batch whose flush fails
/// is dropped, not requeued. Call [`flush_all`](Self::flush_all) before
/// dropping the consumer or the remaining messages are lost.
///
/// `send` never reports the outcome of the flush it triggers. Failed
/// auto-flushes are logged, counted in [`dropped_messages`](Self::dropped_messages)
/// and published on the bounded channel returned by
/// [`with_failure_channel`](Self::with_failure_channel). A failure that finds
/// the channel full is logged and left out of it.
pub struct BufferedConsumer {
    inner: StdConsumer,
    buffers: HashMap<String, EndpointBuffer>,
    max_size: usize,
    dropped: AtomicU64,
    failures: Option<mpsc::Sender<FlushFailure>>,
}

impl BufferedConsumer {
    pub fn new(inner: StdConsumer, max_size: usize) -> Result<Self, BufferError> {
        if max_size == 0 {
            return Err(BufferError::InvalidCapacity { max_size });
        }

        let buffers = inner
            .endpoints()
            .iter()
            .map(|(name, _)| (name.to_string(), EndpointBuffer::new(max_size)))
            .collect();

        Ok(Self {
            inner,
            buffers,
            max_size,
            dropped: AtomicU64::new(0),
            failures: None,
        })
    }

    /// Like [`new`](Self::new), also returning the receiving side of the
    /// auto-flush failure channel, which holds up to `capacity` failures.
    pub fn with_failure_channel(
        inner: StdConsumer,
        max_size: usize,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<FlushFailure>), BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidChannelCapacity { capacity });
        }
        let mut consumer = Self::new(inner, max_size)?;
        let (tx, rx) = mpsc::channel(capacity);
        consumer.failures = Some(tx);
        Ok((consumer, rx))
    }

    pub fn inner(&self) -> &StdConsumer {
        &self.inner
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Registered endpoint names, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        self.inner.endpoints().names()
    }

    /// Number of messages waiting for `endpoint`, `None` if unregistered.
    pub fn buffered_len(&self, endpoint: &str) -> Option<usize> {
        self.buffers.get(endpoint).map(EndpointBuffer::len)
    }

    /// Messages lost to failed flushes since construction.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Delivers everything buffered for `endpoint` as one batch.
    pub async fn flush_endpoint(&self, endpoint: &str) -> Result<(), DeliveryError> {
        let Some(buffer) = self.buffers.get(endpoint) else {
            return Err(self.inner.unknown_endpoint(endpoint));
        };

        let messages = buffer.drain();
        if messages.is_empty() {
            return Ok(());
        }

        self.deliver(Batch::new(endpoint, messages))
            .await
            .map_err(|failure| failure.error)
    }

    /// Flushes every endpoint, attempting all of them even when some fail.
    pub async fn flush_all(&self) -> Result<(), DeliveryError> {
        let flushes = self.buffers.iter().map(|(endpoint, buffer)| async move {
            let messages = buffer.drain();
            if messages.is_empty() {
                return Ok(());
            }
            self.deliver(Batch::new(endpoint.as_str(), messages)).await
        });

        let failures: Vec<FlushFailure> = join_all(flushes)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeliveryError::FlushIncomplete(failures))
        }
    }

    async fn deliver(&self, batch: Batch) -> Result<(), FlushFailure> {
        let payload = batch.encode();
        let payload_len = payload.len();

        match self.inner.send(batch.endpoint(), payload).await {
            Ok(()) => {
                info!(
                    endpoint = batch.endpoint(),
                    batch_id = batch.id(),
                    messages = batch.size(),
                    bytes = payload_len,
                    "Flushed batch"
                );
                Ok(())
            }
            Err(error) => {
                self.dropped
                    .fetch_add(batch.size() as u64, Ordering::Relaxed);
                self.inner.metrics_collector().record_dropped(batch.size());
                warn!(
                    endpoint = batch.endpoint(),
                    batch_id = batch.id(),
                    messages = batch.size(),
                    "Dropping batch after failed flush: {}",
                    error
                );
                Err(FlushFailure {
                    endpoint: batch.endpoint().to_string(),
                    batch_id: batch.id().to_string(),
                    message_count: batch.size(),
                    error,
                })
            }
        }
    }

    fn report(&self, failure: FlushFailure) {
        let Some(tx) = &self.failures else {
            return;
        };

        match tx.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(failure)) => {
                warn!(
                    endpoint = %failure.endpoint,
                    batch_id = %failure.batch_id,
                    "Flush failure channel full; failure not published"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Flush failure receiver dropped; failure already logged");
            }
        }
    }
}

#[async_trait]
impl Consumer for BufferedConsumer {
    async fn send(&self, endpoint: &str, message: Bytes) -> Result<(), DeliveryError> {
        let Some(buffer) = self.buffers.get(endpoint) else {
            return Err(self.inner.unknown_endpoint(endpoint));
        };

        if let Some(messages) = buffer.push(message) {
            debug!(endpoint, messages = messages.len(), "Buffer threshold exceeded, flushing");
            if let Err(failure) = self.deliver(Batch::new(endpoint, messages)).await {
                self.report(failure);
            }
        }

        Ok(())
    }
}

impl Drop for BufferedConsumer {
    fn drop(&mut self) {
        let pending: usize = self.buffers.values().map(EndpointBuffer::len).sum();
        if pending > 0 {
            warn!(
                pending,
                "BufferedConsumer dropped with unflushed messages; call flush_all before shutdown"
            );
        }
    }
}

impl std::fmt::Debug for BufferedConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buffered: HashMap<&str, usize> = self
            .buffers
            .iter()
            .map(|(name, buffer)| (name.as_str(), buffer.len()))
            .collect();

        f.debug_struct("BufferedConsumer")
            .field("max_size", &self.max_size)
            .field("buffered", &buffered)
            .field("dropped", &self.dropped_messages())
            .finish()
    }
}
