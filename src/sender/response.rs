use super::error::DeliveryError;
use serde_json::Value;

/// Maps a Mixpanel `verbose=1` response body to a delivery verdict.
///
/// Only an object whose `status` is the number 1 is a success. Anything else,
/// including bodies that are valid JSON but not an object, is a failure.
pub fn classify_response(body: &[u8]) -> Result<(), DeliveryError> {
    let Ok(Value::Object(response)) = serde_json::from_slice::<Value>(body) else {
        return Err(DeliveryError::UnparseableResponse {
            body: String::from_utf8_lossy(body).into_owned(),
        });
    };

    let Some(status) = response.get("status") else {
        return Err(DeliveryError::ProtocolMismatch);
    };

    if status.as_f64() == Some(1.0) {
        return Ok(());
    }

    let error = response.get("error").and_then(|value| match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    });

    Err(DeliveryError::RemoteRejected { error })
}
