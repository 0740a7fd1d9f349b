//! Anthropic adapter wire tests against a mock server.

use chat_core::{AdapterSettings, FailedReason, Role, Temperature};
use chatting_client::{AnthropicAdapter, ChattingAdapter, StreamDelta};
use context_manager::Turn;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter_for(server: &MockServer) -> AnthropicAdapter {
    AnthropicAdapter::new(AdapterSettings {
        api_key: "ak-test".to_string(),
        domain: Some(server.uri()),
        ..Default::default()
    })
    .unwrap()
}

async fn collect_deltas(mut rx: mpsc::Receiver<StreamDelta>) -> String {
    let mut accumulated = String::new();
    while let Some(delta) = rx.recv().await {
        delta.apply_to(&mut accumulated);
    }
    accumulated
}

#[tokio::test]
async fn blocking_send_returns_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .and(header("x-api-key", "ak-test"))
        .and(body_partial_json(json!({
            "model": "claude-v1",
            "stream": false,
            "stop_sequences": ["\n\nHuman:"],
            "prompt": "\n\nHuman: You are terse.\n\nAssistant: OK\n\nHuman: hi\n\nAssistant: ",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"completion": " Hello.", "stop_reason": "stop_sequence"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let turns = [
        Turn::new(Role::System, "You are terse."),
        Turn::new(Role::User, "hi"),
    ];
    let text = adapter
        .send_blocking(&turns, "claude-v1", Temperature::Balanced)
        .await
        .unwrap();
    assert_eq!(text, " Hello.");
}

#[tokio::test]
async fn streaming_replaces_with_cumulative_snapshots() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"completion\":\"Hel\"}\n\n",
        "data: {\"completion\":\"Hello\"}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (tx, rx) = mpsc::channel(16);
    let turns = [Turn::new(Role::User, "hi")];
    let send = adapter.send_streaming(&turns, "claude-v1", Temperature::Balanced, tx);
    let (result, accumulated) = tokio::join!(send, collect_deltas(rx));
    result.unwrap();
    // Cumulative events replace; "HelHello" would mean append leaked in.
    assert_eq!(accumulated, "Hello");
}

#[tokio::test]
async fn streaming_skips_frames_without_completion() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"log_id\":\"abc\"}\n\n",
        "data: {\"completion\":\"Hi\"}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (tx, rx) = mpsc::channel(16);
    let turns = [Turn::new(Role::User, "hi")];
    let send = adapter.send_streaming(&turns, "claude-v1", Temperature::Balanced, tx);
    let (result, accumulated) = tokio::join!(send, collect_deltas(rx));
    result.unwrap();
    assert_eq!(accumulated, "Hi");
}

#[tokio::test]
async fn forbidden_maps_to_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (tx, _rx) = mpsc::channel(16);
    let turns = [Turn::new(Role::User, "hi")];
    let err = adapter
        .send_streaming(&turns, "claude-v1", Temperature::Balanced, tx)
        .await
        .unwrap_err();
    assert_eq!(err.failed_reason(), FailedReason::Network);
}

#[tokio::test]
async fn unauthorized_maps_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (tx, _rx) = mpsc::channel(16);
    let turns = [Turn::new(Role::User, "hi")];
    let err = adapter
        .send_streaming(&turns, "claude-v1", Temperature::Balanced, tx)
        .await
        .unwrap_err();
    assert_eq!(err.failed_reason(), FailedReason::Authentication);
}

#[tokio::test]
async fn validate_config_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .and(body_partial_json(json!({
            "prompt": "\n\nHuman: Test\n\nAssistant: ",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"completion": " OK"})))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    adapter.validate_config().await.unwrap();
}
