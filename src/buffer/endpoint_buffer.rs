use bytes::Bytes;
use parking_lot::Mutex;

const MAX_PREALLOCATED: usize = 4096;

fn initial_capacity(max_size: usize) -> usize {
    max_size.saturating_add(1).min(MAX_PREALLOCATED)
}

/// FIFO of pending messages for one endpoint.
///
/// The lock covers append and snapshot-and-clear only; callers encode and
/// transmit a snapshot after the guard is released.
#[derive(Debug)]
pub struct EndpointBuffer {
    messages: Mutex<Vec<Bytes>>,
    max_size: usize,
}

impl EndpointBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::with_capacity(initial_capacity(max_size))),
            max_size,
        }
    }

    /// Appends `message`. Once the length exceeds `max_size` the buffer is
    /// drained in the same critical section and the snapshot is returned.
    pub fn push(&self, message: Bytes) -> Option<Vec<Bytes>> {
        let mut messages = self.messages.lock();
        messages.push(message);

        if messages.len() > self.max_size {
            Some(std::mem::replace(
                &mut *messages,
                Vec::with_capacity(initial_capacity(self.max_size)),
            ))
        } else {
            None
        }
    }

    /// Takes every buffered message, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Bytes> {
        let mut messages = self.messages.lock();
        if messages.is_empty() {
            return Vec::new();
        }
        std::mem::replace(&mut *messages, Vec::with_capacity(initial_capacity(self.max_size)))
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
