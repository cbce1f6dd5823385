use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout: {0}")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let (timeout, connect, body) = (err.is_timeout(), err.is_connect(), err.is_body() || err.is_decode());
        // Strip the URL: it carries the whole encoded payload.
        let message = err.without_url().to_string();
        if timeout {
            TransportError::Timeout(message)
        } else if connect {
            TransportError::Connect(message)
        } else if body {
            TransportError::Body(message)
        } else {
            TransportError::Request(message)
        }
    }
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("No such endpoint '{endpoint}'. Valid endpoints are one of {valid:?}")]
    UnknownEndpoint { endpoint: String, valid: Vec<String> },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Mixpanel error: {}", .error.as_deref().unwrap_or("<no error message>"))]
    RemoteRejected { error: Option<String> },

    #[error("Could not find field 'status' in response, api change?")]
    ProtocolMismatch,

    #[error("Cannot interpret Mixpanel server response: {body}")]
    UnparseableResponse { body: String },

    #[error("Flush failed for {} endpoint(s): {}", .0.len(), summarize(.0))]
    FlushIncomplete(Vec<FlushFailure>),
}

/// Discriminant of [`DeliveryError`], used for metrics and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    UnknownEndpoint,
    Transport,
    RemoteRejected,
    ProtocolMismatch,
    UnparseableResponse,
    FlushIncomplete,
}

impl DeliveryError {
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            DeliveryError::UnknownEndpoint { .. } => DeliveryErrorKind::UnknownEndpoint,
            DeliveryError::Transport(_) => DeliveryErrorKind::Transport,
            DeliveryError::RemoteRejected { .. } => DeliveryErrorKind::RemoteRejected,
            DeliveryError::ProtocolMismatch => DeliveryErrorKind::ProtocolMismatch,
            DeliveryError::UnparseableResponse { .. } => DeliveryErrorKind::UnparseableResponse,
            DeliveryError::FlushIncomplete(_) => DeliveryErrorKind::FlushIncomplete,
        }
    }

    pub(crate) fn unknown_endpoint(endpoint: &str, valid: Vec<String>) -> Self {
        DeliveryError::UnknownEndpoint {
            endpoint: endpoint.to_string(),
            valid,
        }
    }
}

/// A batch that could not be delivered and was dropped.
#[derive(Debug)]
pub struct FlushFailure {
    pub endpoint: String,
    pub batch_id: String,
    pub message_count: usize,
    pub error: DeliveryError,
}

fn summarize(failures: &[FlushFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({} messages): {}", f.endpoint, f.message_count, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_endpoint_lists_valid_names() {
        let err = DeliveryError::unknown_endpoint("evnts", vec!["events".into(), "people".into()]);
        let message = err.to_string();

        assert!(message.contains("'evnts'"));
        assert!(message.contains("\"events\""));
        assert!(message.contains("\"people\""));
        assert_eq!(err.kind(), DeliveryErrorKind::UnknownEndpoint);
    }

    #[test]
    fn test_remote_rejected_display() {
        let err = DeliveryError::RemoteRejected {
            error: Some("token, missing or empty".into()),
        };
        assert_eq!(err.to_string(), "Mixpanel error: token, missing or empty");

        let err = DeliveryError::RemoteRejected { error: None };
        assert_eq!(err.to_string(), "Mixpanel error: <no error message>");
    }

    #[test]
    fn test_flush_incomplete_summary() {
        let err = DeliveryError::FlushIncomplete(vec![FlushFailure {
            endpoint: "people".into(),
            batch_id: "b1".into(),
            message_count: 3,
            error: DeliveryError::ProtocolMismatch,
        }]);

        let message = err.to_string();
        assert!(message.starts_with("Flush failed for 1 endpoint(s)"));
        assert!(message.contains("people (3 messages)"));
    }
}
