//! Models endpoint integration tests
//!
//! Tests for the models endpoints:
//! - GET /v1/models - List available models
//! - GET /v1/models/:id - Get specific model

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use wiremock::MockServer;

use crate::common::{create_test_server, create_test_server_with, test_config};

#[derive(Debug, Deserialize)]
struct Model {
    id: String,
    object: String,
    created: i64,
    owned_by: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    object: String,
    data: Vec<Model>,
}

#[tokio::test]
async fn test_list_models_returns_default_catalog() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let response = server.get("/v1/models").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ModelsResponse = response.json();
    assert_eq!(body.object, "list");
    assert_eq!(body.data.len(), 9);
    for model in &body.data {
        assert_eq!(model.object, "model");
        assert_eq!(model.owned_by, "openai");
        assert!(model.created > 0);
    }
    assert!(body
        .data
        .iter()
        .any(|m| m.id == "gemini-2.5-flash-lite-preview-06-17"));
}

#[tokio::test]
async fn test_list_models_follows_config() {
    let upstream = MockServer::start().await;
    let mut config = test_config(&upstream);
    config.models = vec!["alpha".to_string(), "beta".to_string()];
    let server = create_test_server_with(config);

    let body: ModelsResponse = server.get("/v1/models").await.json();

    let ids: Vec<&str> = body.data.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_get_model_found() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let response = server.get("/v1/models/gpt-5").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let model: Model = response.json();
    assert_eq!(model.id, "gpt-5");
}

#[tokio::test]
async fn test_get_model_not_found() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let response = server.get("/v1/models/nonexistent-model").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("nonexistent-model"));
}
