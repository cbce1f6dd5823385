use super::error::DeliveryErrorKind;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Percentile of an already sorted sample set, clamped to its bounds.
fn calculate_percentile(sorted_samples: &[Duration], percentile: f64) -> Duration {
    if sorted_samples.is_empty() {
        return Duration::ZERO;
    }

    let percentile = percentile.clamp(0.0, 1.0);
    let last = sorted_samples.len() - 1;
    let index = ((percentile * last as f64).floor() as usize).min(last);

    sorted_samples[index]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_bytes_sent: u64,
    pub transport_errors: u64,
    pub rejected_responses: u64,
    pub invalid_responses: u64,
    pub dropped_messages: u64,
    pub average_latency: Duration,
    pub p95_latency: Duration,
    pub p99_latency: Duration,
}

#[derive(Clone)]
pub struct MetricsCollector {
    total_requests: Arc<AtomicU64>,
    successful_requests: Arc<AtomicU64>,
    failed_requests: Arc<AtomicU64>,
    total_bytes: Arc<AtomicU64>,
    transport_errors: Arc<AtomicU64>,
    rejected_responses: Arc<AtomicU64>,
    invalid_responses: Arc<AtomicU64>,
    dropped_messages: Arc<AtomicU64>,
    latency_samples: Arc<Mutex<VecDeque<Duration>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            total_requests: Arc::new(AtomicU64::new(0)),
            successful_requests: Arc::new(AtomicU64::new(0)),
            failed_requests: Arc::new(AtomicU64::new(0)),
            total_bytes: Arc::new(AtomicU64::new(0)),
            transport_errors: Arc::new(AtomicU64::new(0)),
            rejected_responses: Arc::new(AtomicU64::new(0)),
            invalid_responses: Arc::new(AtomicU64::new(0)),
            dropped_messages: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES))),
        }
    }

    /// Records one request round trip. `failure` is `None` on success.
    pub fn record_request(
        &self,
        failure: Option<DeliveryErrorKind>,
        bytes_sent: usize,
        latency: Duration,
    ) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes_sent as u64, Ordering::Relaxed);

        match failure {
            None => {
                self.successful_requests.fetch_add(1, Ordering::Relaxed);
            }
            Some(kind) => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                let counter = match kind {
                    DeliveryErrorKind::Transport => &self.transport_errors,
                    DeliveryErrorKind::RemoteRejected => &self.rejected_responses,
                    _ => &self.invalid_responses,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut samples = self.latency_samples.lock();
        if samples.len() == MAX_LATENCY_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(latency);
    }

    pub fn record_dropped(&self, messages: usize) {
        self.dropped_messages
            .fetch_add(messages as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryMetrics {
        let (average_latency, p95_latency, p99_latency) = {
            let samples = self.latency_samples.lock();
            if samples.is_empty() {
                (Duration::ZERO, Duration::ZERO, Duration::ZERO)
            } else {
                let mut sorted: Vec<Duration> = samples.iter().copied().collect();
                sorted.sort();

                let total: Duration = sorted.iter().sum();
                let average = total / sorted.len() as u32;

                (
                    average,
                    calculate_percentile(&sorted, 0.95),
                    calculate_percentile(&sorted, 0.99),
                )
            }
        };

        DeliveryMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            total_bytes_sent: self.total_bytes.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            rejected_responses: self.rejected_responses.load(Ordering::Relaxed),
            invalid_responses: self.invalid_responses.load(Ordering::Relaxed),
            dropped_messages: self.dropped_messages.load(Ordering::Relaxed),
            average_latency,
            p95_latency,
            p99_latency,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
