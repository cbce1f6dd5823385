pub mod endpoint;

pub use endpoint::{DEFAULT_API_HOST, Endpoint, EndpointMap};
