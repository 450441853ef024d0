//! Tests for transport.rs — the reqwest strategy against a real HTTP server.

use edgekit_net::{NetworkRequester, NetworkStrategy, ReqwestStrategy};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn posts_the_body_and_surfaces_status_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ee/v1/interact"))
        .and(body_string(r#"{"events":[]}"#))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"requestId":"r1","handle":[]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let strategy = ReqwestStrategy::new();
    let response = strategy
        .send(
            &format!("{}/ee/v1/interact", server.uri()),
            r#"{"events":[]}"#,
        )
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"requestId":"r1","handle":[]}"#);
}

#[tokio::test]
async fn requester_retries_5xx_against_a_live_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "requestId": "r1", "handle": [] })),
        )
        .mount(&server)
        .await;

    let requester = NetworkRequester::new(Arc::new(ReqwestStrategy::new()));
    let response = requester
        .send(&format!("{}/collect", server.uri()), "{}", "RID123")
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.parsed_body,
        Some(json!({ "requestId": "r1", "handle": [] }))
    );
}

#[tokio::test]
async fn connection_failure_maps_to_a_network_error() {
    // Port 9 (discard) is a safe never-listening target.
    let strategy = ReqwestStrategy::new();
    let error = strategy
        .send("http://127.0.0.1:9/interact", "{}")
        .await
        .unwrap_err();
    assert!(error.to_string().starts_with("Network request failed."));
}
