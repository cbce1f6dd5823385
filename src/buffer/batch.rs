use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Frames already-serialized records as one JSON array: `[m0,m1,...]`.
///
/// Pure byte concatenation. The records are not parsed or validated, and the
/// output capacity is computed exactly up front.
pub fn encode_json_array(messages: &[Bytes]) -> Bytes {
    if messages.is_empty() {
        return Bytes::from_static(b"[]");
    }

    let mut buffer = BytesMut::with_capacity(encoded_len(messages));
    buffer.put_u8(b'[');
    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            buffer.put_u8(b',');
        }
        buffer.put_slice(message);
    }
    buffer.put_u8(b']');

    buffer.freeze()
}

/// Exact length of [`encode_json_array`]'s output.
pub fn encoded_len(messages: &[Bytes]) -> usize {
    let separators = messages.len().saturating_sub(1);
    messages.iter().map(Bytes::len).sum::<usize>() + separators + 2
}

/// Messages drained from one endpoint buffer by a single flush.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    endpoint: String,
    messages: Vec<Bytes>,
}

impl Batch {
    pub fn new(endpoint: impl Into<String>, messages: Vec<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint: endpoint.into(),
            messages,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn encode(&self) -> Bytes {
        encode_json_array(&self.messages)
    }
}
