#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mixpanel_sender::EndpointMap;
use serde_json::Value;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCEPTED: &str = r#"{"status":1,"error":null}"#;

pub fn endpoints(server: &MockServer) -> EndpointMap {
    let host = Url::parse(&server.uri()).unwrap();
    EndpointMap::mixpanel(&host, None)
}

/// Answers every GET to `route` with `body`.
pub async fn mount_body(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Decoded `data` parameter of a request URL.
pub fn decode_data(url: &Url) -> Value {
    let (_, data) = url
        .query_pairs()
        .find(|(key, _)| key == "data")
        .expect("request without data parameter");
    let raw = URL_SAFE_NO_PAD.decode(data.as_bytes()).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

/// Decoded payloads of every request received on `route`, in arrival order.
pub async fn payloads(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .map(|request| decode_data(&request.url))
        .collect()
}
