use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Invalid buffer threshold: {max_size} (must be greater than 0)")]
    InvalidCapacity { max_size: usize },
    #[error("Invalid failure channel capacity: {capacity} (must be greater than 0)")]
    InvalidChannelCapacity { capacity: usize },
}
