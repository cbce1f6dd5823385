#![deny(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Latency millis and byte counts stay within u64
    clippy::cast_precision_loss,      // Acceptable for metrics/display
    clippy::missing_errors_doc,       // Error enums document themselves
    clippy::module_name_repetitions,  // e.g. BufferError in buffer module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown
)]

//! Delivery of analytics events and people-profile updates to the Mixpanel
//! HTTP ingestion API.
//!
//! Records are sent through a [`sender::Consumer`]: either a
//! [`sender::StdConsumer`] (one GET per record) or a
//! [`buffer::BufferedConsumer`] (per-endpoint buffers flushed as JSON array
//! batches). The [`tracker::Mixpanel`] client builds the records.

pub mod app;
pub mod buffer;
pub mod domain;
pub mod sender;
pub mod tracker;

// Re-export main types for easy access
pub use app::{App, Config};
pub use buffer::BufferedConsumer;
pub use domain::{Endpoint, EndpointMap};
pub use sender::{Consumer, DeliveryError, StdConsumer};
pub use tracker::{Mixpanel, Properties};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
