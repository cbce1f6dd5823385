mod common;

use common::{ACCEPTED, mount_body, payloads};
use mixpanel_sender::App;
use mixpanel_sender::app::{Command, ConfigError};
use serde_json::json;
use serial_test::serial;
use std::io::Write;
use wiremock::MockServer;

fn app(server: &MockServer, args: &[&str]) -> Result<App, ConfigError> {
    let uri = server.uri();
    let mut argv = vec!["mixpanel-sender", "--token", "cli-token", "--api-host", uri.as_str()];
    argv.extend_from_slice(args);
    App::from_args(argv)
}

#[tokio::test]
#[serial]
async fn test_track_command_end_to_end() {
    let server = MockServer::start().await;
    mount_body(&server, "/track", ACCEPTED).await;

    let app = app(&server, &["track", "user-7", "Purchase", "item=socks", "color=red"]).unwrap();
    assert_eq!(app.command().name(), "track");
    app.run().await.unwrap();

    let sent = payloads(&server, "/track").await;
    assert_eq!(sent[0]["event"], "Purchase");
    assert_eq!(sent[0]["properties"]["token"], "cli-token");
    assert_eq!(sent[0]["properties"]["item"], "socks");
}

#[tokio::test]
#[serial]
async fn test_add_and_union_commands_shape_values() {
    let server = MockServer::start().await;
    mount_body(&server, "/engage", ACCEPTED).await;

    app(&server, &["add", "user-7", "coins=-2"]).unwrap().run().await.unwrap();
    app(&server, &["union", "user-7", "items=hat"]).unwrap().run().await.unwrap();

    let sent = payloads(&server, "/engage").await;
    assert_eq!(sent[0]["$add"]["coins"], json!(-2.0));
    assert_eq!(sent[1]["$union"]["items"], json!(["hat"]));
}

#[tokio::test]
#[serial]
async fn test_buffered_run_flushes_before_returning() {
    let server = MockServer::start().await;
    mount_body(&server, "/engage", ACCEPTED).await;

    let app = app(&server, &["--buffer-size", "10", "charge", "user-7", "9.5"]).unwrap();
    assert_eq!(app.config().buffer_size, Some(10));
    app.run().await.unwrap();

    let sent = payloads(&server, "/engage").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][0]["$append"]["$transactions"]["$amount"], json!(9.5));
}

#[tokio::test]
#[serial]
async fn test_rejected_record_fails_the_run() {
    let server = MockServer::start().await;
    mount_body(&server, "/engage", r#"{"status":0,"error":"nope"}"#).await;

    let err = app(&server, &["delete", "user-7"]).unwrap().run().await.unwrap_err();
    assert!(format!("{err:#}").contains("nope"));
}

#[tokio::test]
#[serial]
async fn test_malformed_property_fails_the_run() {
    let server = MockServer::start().await;

    let err = app(&server, &["set", "user-7", "no-separator"])
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expected key=value"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[test]
#[serial]
fn test_config_file_supplies_token() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "token = \"file-token\"\nbuffer_size = 4").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let app = App::from_args(["mixpanel-sender", "--config-file", path.as_str(), "delete", "u"]).unwrap();
    assert_eq!(app.config().token.as_deref(), Some("file-token"));
    assert_eq!(app.config().buffer_size, Some(4));
    assert_eq!(
        app.command(),
        &Command::Delete {
            distinct_id: "u".to_string()
        }
    );
}

#[test]
#[serial]
fn test_unknown_subcommand_is_rejected() {
    let err = App::from_args(["mixpanel-sender", "--token", "t", "frobnicate"]).unwrap_err();
    assert!(matches!(err, ConfigError::Args(_)));
}
