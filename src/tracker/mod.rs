//! Builds Mixpanel event and people-profile records and hands them to a
//! [`Consumer`].

pub mod properties;

pub use properties::{Properties, merge_properties};

use crate::domain::{DEFAULT_API_HOST, Endpoint, EndpointMap};
use crate::sender::{ClientConfig, ClientError, Consumer, DeliveryError, StdConsumer};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

const LIB_NAME: &str = "rust";

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[derive(Serialize)]
struct Event<'a> {
    event: &'a str,
    properties: &'a Properties,
}

/// Entry point for tracking events and updating people profiles.
#[derive(Clone)]
pub struct Mixpanel {
    token: String,
    consumer: Arc<dyn Consumer>,
}

impl Mixpanel {
    pub fn new(token: impl Into<String>, consumer: Arc<dyn Consumer>) -> Self {
        Self {
            token: token.into(),
            consumer,
        }
    }

    /// A tracker sending one request per record to the public API host.
    pub fn with_std_consumer(token: impl Into<String>) -> Result<Self, ClientError> {
        let host = Url::parse(DEFAULT_API_HOST)
            .map_err(|e| ClientError::InvalidConfiguration(e.to_string()))?;
        let consumer =
            StdConsumer::with_client_config(EndpointMap::mixpanel(&host, None), ClientConfig::default())?;
        Ok(Self::new(token, Arc::new(consumer)))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn consumer(&self) -> &Arc<dyn Consumer> {
        &self.consumer
    }

    /// Records that `event` happened for `distinct_id`.
    pub async fn track(
        &self,
        distinct_id: &str,
        event: &str,
        properties: Option<Properties>,
    ) -> Result<(), TrackerError> {
        self.send_event(Endpoint::Events, distinct_id, event, properties)
            .await
    }

    /// Same as [`track`](Self::track), for events older than five days.
    pub async fn import(
        &self,
        distinct_id: &str,
        event: &str,
        properties: Option<Properties>,
    ) -> Result<(), TrackerError> {
        self.send_event(Endpoint::Import, distinct_id, event, properties)
            .await
    }

    /// Links `alias_id` to the profile currently known as `original_id`.
    pub async fn alias(&self, alias_id: &str, original_id: &str) -> Result<(), TrackerError> {
        let properties = object(json!({
            "distinct_id": original_id,
            "alias": alias_id,
        }));
        self.track(original_id, "$create_alias", Some(properties))
            .await
    }

    /// Sends a raw people update. The caller supplies the operation keys.
    pub async fn people_update(&self, properties: Properties) -> Result<(), TrackerError> {
        let mut record = object(json!({
            "$token": self.token,
            "$time": chrono::Utc::now().timestamp(),
        }));
        merge_properties(&mut record, properties);

        self.send(Endpoint::People, &record).await
    }

    pub async fn people_set(&self, distinct_id: &str, properties: Properties) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$set", Value::Object(properties))
            .await
    }

    /// Like [`people_set`](Self::people_set) but never overwrites existing values.
    pub async fn people_set_once(
        &self,
        distinct_id: &str,
        properties: Properties,
    ) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$set_once", Value::Object(properties))
            .await
    }

    /// Adds numeric values to profile properties (negative values subtract).
    pub async fn people_increment(
        &self,
        distinct_id: &str,
        properties: Properties,
    ) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$add", Value::Object(properties))
            .await
    }

    pub async fn people_append(
        &self,
        distinct_id: &str,
        properties: Properties,
    ) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$append", Value::Object(properties))
            .await
    }

    /// Merges list values into profile list properties, ignoring duplicates.
    pub async fn people_union(
        &self,
        distinct_id: &str,
        properties: Properties,
    ) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$union", Value::Object(properties))
            .await
    }

    pub async fn people_unset(&self, distinct_id: &str, names: Vec<String>) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$unset", json!(names))
            .await
    }

    /// Permanently deletes the profile.
    pub async fn people_delete(&self, distinct_id: &str) -> Result<(), TrackerError> {
        self.people_operation(distinct_id, "$delete", json!(""))
            .await
    }

    /// Appends a charge of `amount` to the profile's `$transactions`.
    pub async fn people_track_charge(
        &self,
        distinct_id: &str,
        amount: f64,
        properties: Option<Properties>,
    ) -> Result<(), TrackerError> {
        let mut transaction = properties.unwrap_or_default();
        transaction.insert("$amount".to_string(), json!(amount));

        let mut append = Properties::new();
        append.insert("$transactions".to_string(), Value::Object(transaction));
        self.people_append(distinct_id, append).await
    }

    async fn people_operation(
        &self,
        distinct_id: &str,
        operation: &str,
        value: Value,
    ) -> Result<(), TrackerError> {
        let mut update = Properties::new();
        update.insert("$distinct_id".to_string(), json!(distinct_id));
        update.insert(operation.to_string(), value);
        self.people_update(update).await
    }

    async fn send_event(
        &self,
        endpoint: Endpoint,
        distinct_id: &str,
        event: &str,
        properties: Option<Properties>,
    ) -> Result<(), TrackerError> {
        let mut merged = object(json!({
            "token": self.token,
            "distinct_id": distinct_id,
            "time": chrono::Utc::now().timestamp(),
            "mp_lib": LIB_NAME,
            "$lib_version": crate::VERSION,
        }));
        if let Some(properties) = properties {
            merge_properties(&mut merged, properties);
        }

        self.send(endpoint, &Event { event, properties: &merged })
            .await
    }

    async fn send<T: Serialize + ?Sized>(&self, endpoint: Endpoint, record: &T) -> Result<(), TrackerError> {
        let message = Bytes::from(serde_json::to_vec(record)?);
        debug!(endpoint = endpoint.as_str(), bytes = message.len(), "Sending record");
        self.consumer.send(endpoint.as_str(), message).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Mixpanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixpanel").field("token", &self.token).finish_non_exhaustive()
    }
}

fn object(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl Consumer for Recorder {
        async fn send(&self, endpoint: &str, message: Bytes) -> Result<(), DeliveryError> {
            let value = serde_json::from_slice(&message).unwrap();
            self.sent.lock().push((endpoint.to_string(), value));
            Ok(())
        }
    }

    fn tracker() -> (Mixpanel, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (Mixpanel::new("tok", recorder.clone()), recorder)
    }

    fn last(recorder: &Recorder) -> (String, Value) {
        recorder.sent.lock().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_track_record_shape() {
        let (mp, recorder) = tracker();
        let properties = object(json!({"Old Plan": "Business", "New Plan": "Premium"}));
        mp.track("user-1", "Plan Upgraded", Some(properties)).await.unwrap();

        let (endpoint, record) = last(&recorder);
        assert_eq!(endpoint, "events");
        assert_eq!(record["event"], "Plan Upgraded");
        let props = &record["properties"];
        assert_eq!(props["token"], "tok");
        assert_eq!(props["distinct_id"], "user-1");
        assert_eq!(props["mp_lib"], "rust");
        assert_eq!(props["$lib_version"], crate::VERSION);
        assert_eq!(props["New Plan"], "Premium");
        assert!(props["time"].is_i64());
    }

    #[tokio::test]
    async fn test_caller_properties_override_defaults() {
        let (mp, recorder) = tracker();
        mp.import("u", "Old Event", Some(object(json!({"time": 1_600_000_000}))))
            .await
            .unwrap();

        let (endpoint, record) = last(&recorder);
        assert_eq!(endpoint, "import");
        assert_eq!(record["properties"]["time"], 1_600_000_000);
    }

    #[tokio::test]
    async fn test_alias() {
        let (mp, recorder) = tracker();
        mp.alias("amy@example.com", "13793").await.unwrap();

        let (_, record) = last(&recorder);
        assert_eq!(record["event"], "$create_alias");
        assert_eq!(record["properties"]["distinct_id"], "13793");
        assert_eq!(record["properties"]["alias"], "amy@example.com");
    }

    #[tokio::test]
    async fn test_people_operations() {
        let (mp, recorder) = tracker();
        let props = || object(json!({"k": "v"}));

        mp.people_set("id", props()).await.unwrap();
        mp.people_set_once("id", props()).await.unwrap();
        mp.people_increment("id", object(json!({"Coins": 12}))).await.unwrap();
        mp.people_append("id", props()).await.unwrap();
        mp.people_union("id", object(json!({"Items": ["socks"]}))).await.unwrap();
        mp.people_unset("id", vec!["Days Overdue".into()]).await.unwrap();
        mp.people_delete("id").await.unwrap();

        let sent = recorder.sent.lock().clone();
        let operations: Vec<&str> = ["$set", "$set_once", "$add", "$append", "$union", "$unset", "$delete"].to_vec();
        assert_eq!(sent.len(), operations.len());

        for ((endpoint, record), operation) in sent.iter().zip(operations) {
            assert_eq!(endpoint, "people");
            assert_eq!(record["$token"], "tok");
            assert_eq!(record["$distinct_id"], "id");
            assert!(record["$time"].is_i64());
            assert!(record.get(operation).is_some(), "missing {operation}");
        }
        assert_eq!(sent[5].1["$unset"], json!(["Days Overdue"]));
        assert_eq!(sent[6].1["$delete"], "");
    }

    #[tokio::test]
    async fn test_track_charge() {
        let (mp, recorder) = tracker();
        mp.people_track_charge("1234", 50.0, Some(object(json!({"$time": "2013-04-01T09:02:00"}))))
            .await
            .unwrap();

        let (_, record) = last(&recorder);
        let transaction = &record["$append"]["$transactions"];
        assert_eq!(transaction["$amount"], 50.0);
        assert_eq!(transaction["$time"], "2013-04-01T09:02:00");
    }

    #[tokio::test]
    async fn test_delivery_error_propagates() {
        struct Rejecting;

        #[async_trait]
        impl Consumer for Rejecting {
            async fn send(&self, _: &str, _: Bytes) -> Result<(), DeliveryError> {
                Err(DeliveryError::ProtocolMismatch)
            }
        }

        let mp = Mixpanel::new("tok", Arc::new(Rejecting));
        let err = mp.track("u", "e", None).await.unwrap_err();
        assert!(matches!(err, TrackerError::Delivery(DeliveryError::ProtocolMismatch)));
    }
}
