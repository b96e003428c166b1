//! Chat completions endpoint integration tests
//!
//! Tests for POST /v1/chat/completions against a mock upstream:
//! - Non-streaming aggregation
//! - Streaming translation, including raw frames and missing terminals
//! - Upstream and token failures
//! - Shape of the request sent upstream

use axum::http::StatusCode;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{constants, create_test_server, sse_body, upstream_mocks};

fn delta(text: &str) -> String {
    json!({"event": "message_delta", "data": {"delta": text}}).to_string()
}

/// Split an SSE response body into its `data:` payloads
fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|event| !event.trim().is_empty())
        .map(|event| {
            event
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}

async fn upstream_with_stream(payloads: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    upstream_mocks::mock_jwt(&server).await;
    upstream_mocks::mock_chat_stream(&server, sse_body(payloads)).await;
    server
}

fn user_request(stream: bool) -> Value {
    json!({
        "model": "gpt-5",
        "stream": stream,
        "messages": [{"role": "user", "content": "Hello"}]
    })
}

#[tokio::test]
async fn test_non_streaming_concatenates_deltas() {
    let (a, b) = (delta("A"), delta("B"));
    let upstream = upstream_with_stream(&[a.as_str(), b.as_str(), "[DONE]"]).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "gpt-5");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "AB");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["total_tokens"], 0);
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
}

#[tokio::test]
async fn test_non_streaming_uses_full_message_text() {
    let message = json!({"event": "message", "data": {"text": "whole answer"}}).to_string();
    let upstream = upstream_with_stream(&[message.as_str()]).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "whole answer");
}

#[tokio::test]
async fn test_streaming_emits_chunks_finish_and_done() {
    let (a, b) = (delta("A"), delta("B"));
    let upstream = upstream_with_stream(&[a.as_str(), b.as_str(), "[DONE]"]).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(true))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "text/event-stream");
    assert_eq!(response.header("cache-control"), "no-cache");

    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 4);

    let chunks: Vec<Value> = payloads[..3]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();
    assert_eq!(chunks[0]["object"], "chat.completion.chunk");
    assert_eq!(chunks[0]["choices"][0]["delta"]["content"], "A");
    assert_eq!(chunks[1]["choices"][0]["delta"]["content"], "B");
    assert_eq!(chunks[2]["choices"][0]["delta"], json!({}));
    assert_eq!(chunks[2]["choices"][0]["finish_reason"], "stop");
    assert_eq!(chunks[0]["id"], chunks[1]["id"]);
    assert_eq!(chunks[1]["id"], chunks[2]["id"]);
    assert_eq!(payloads[3], "[DONE]");
}

#[tokio::test]
async fn test_streaming_forwards_non_json_frames_as_text() {
    let upstream = upstream_with_stream(&["plain words", "[DONE]"]).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(true))
        .await;

    let payloads = sse_payloads(&response.text());
    let first: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(first["choices"][0]["delta"]["content"], "plain words");
    assert_eq!(payloads.last().unwrap(), "[DONE]");
}

#[tokio::test]
async fn test_streaming_without_terminal_still_finishes() {
    let a = delta("A");
    let upstream = upstream_with_stream(&[a.as_str()]).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(true))
        .await;

    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 3);
    let finish: Value = serde_json::from_str(&payloads[1]).unwrap();
    assert_eq!(finish["choices"][0]["finish_reason"], "stop");
    assert_eq!(payloads[2], "[DONE]");
}

#[tokio::test]
async fn test_streaming_stops_at_message_end() {
    let (a, b) = (delta("A"), delta("B"));
    let end = json!({"event": "message_end"}).to_string();
    let upstream = upstream_with_stream(&[a.as_str(), end.as_str(), b.as_str()]).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "A");
}

#[tokio::test]
async fn test_json_upstream_body_is_returned_as_text() {
    let upstream = MockServer::start().await;
    upstream_mocks::mock_jwt(&upstream).await;
    upstream_mocks::mock_chat_json(&upstream, json!({"text": "from json"})).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "from json");
}

#[tokio::test]
async fn test_json_upstream_body_is_streamed_as_one_chunk() {
    let upstream = MockServer::start().await;
    upstream_mocks::mock_jwt(&upstream).await;
    upstream_mocks::mock_chat_json(&upstream, json!({"text": "from json"})).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(true))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "text/event-stream");

    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 3);

    let fragment: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(fragment["choices"][0]["delta"]["content"], "from json");
    assert!(fragment["choices"][0]["finish_reason"].is_null());

    let finish: Value = serde_json::from_str(&payloads[1]).unwrap();
    assert_eq!(finish["choices"][0]["delta"], json!({}));
    assert_eq!(finish["choices"][0]["finish_reason"], "stop");
    assert_eq!(finish["id"], fragment["id"]);
    assert_eq!(payloads[2], "[DONE]");
}

#[tokio::test]
async fn test_upstream_error_is_bad_gateway() {
    let upstream = MockServer::start().await;
    upstream_mocks::mock_jwt(&upstream).await;
    upstream_mocks::mock_chat_error(&upstream, 500, "boom").await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("500"));
    assert!(message.contains("boom"));
}

#[tokio::test]
async fn test_token_failure_is_internal_error() {
    let upstream = MockServer::start().await;
    upstream_mocks::mock_jwt_failure(&upstream, 403).await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("get_jwt failed"));
}

#[tokio::test]
async fn test_token_response_without_jwt_is_internal_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(constants::JWT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&upstream)
        .await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&user_request(false))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "no jwt");
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{\"messages\": 42}"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_is_reshaped_for_upstream() {
    let upstream = MockServer::start().await;
    upstream_mocks::mock_jwt(&upstream).await;
    Mock::given(method("POST"))
        .and(path(constants::CHAT_PATH))
        .and(body_partial_json(json!({
            "query": "second question",
            "user": "web-user",
            "response_mode": "streaming",
            "conversation_id": "",
            "inputs": {
                "llm_model": "gpt-5",
                "web_search": "off",
                "thinking_budget": 8192
            },
            "messages": [
                {"role": "system", "content": "be brief", "llm_model": "gpt-5"},
                {"role": "user", "content": "first question"},
                {"role": "assistant", "content": "first answer"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sse_body(&[delta("ok").as_str(), "[DONE]"]))
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&json!({
            "model": "gpt-5",
            "reasoning_effort": "medium",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "first question"},
                {"role": "assistant", "content": "first answer"},
                {"role": "user", "content": "second question"}
            ]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "ok");
}

#[tokio::test]
async fn test_missing_model_uses_default() {
    let upstream = MockServer::start().await;
    upstream_mocks::mock_jwt(&upstream).await;
    Mock::given(method("POST"))
        .and(path(constants::CHAT_PATH))
        .and(body_partial_json(json!({
            "inputs": {"llm_model": "gemini-2.5-flash-lite-preview-06-17"}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sse_body(&["[DONE]"]))
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    let server = create_test_server(&upstream);

    let response = server
        .post("/v1/chat/completions")
        .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
        .await;

    let body: Value = response.json();
    assert_eq!(body["model"], "gemini-2.5-flash-lite-preview-06-17");
    assert_eq!(body["choices"][0]["message"]["content"], "");
}
