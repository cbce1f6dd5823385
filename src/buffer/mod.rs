pub mod batch;
pub mod consumer;
pub mod endpoint_buffer;
pub mod error;

pub use batch::{Batch, encode_json_array, encoded_len};
pub use consumer::BufferedConsumer;
pub use endpoint_buffer::EndpointBuffer;
pub use error::BufferError;
