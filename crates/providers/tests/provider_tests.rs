// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the provider adapters
//!
//! These tests use wiremock to stand in for the provider HTTP APIs and check
//! that every adapter hands back a plain response string.

use model_client::{ModelClient, ProviderError};
use providers::{
    GeminiClient, GeminiConfig, ModelSelector, OllamaClient, OllamaConfig, ProviderKind,
    ProviderSettings,
};
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

const CLASSIFIED_RESPONSE: &str = "##Classification: 'smishing'\n##Explanation: suspicious link";

fn ollama_client(mock_server: &MockServer, model: &str) -> OllamaClient {
    let base_url = Url::parse(&mock_server.uri()).unwrap();
    OllamaClient::new(OllamaConfig::default().with_base_url(base_url), model).unwrap()
}

fn gemini_client(mock_server: &MockServer) -> GeminiClient {
    let base_url = Url::parse(&mock_server.uri()).unwrap();
    GeminiClient::new(
        GeminiConfig::new("test-google-key").with_base_url(base_url),
        "gemma-3n-e4b-it",
    )
    .unwrap()
}

#[tokio::test]
async fn ollama_generate_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "gemma3n:e2b",
            "prompt": "Classify: win a prize",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gemma3n:e2b",
            "created_at": "2025-06-24T09:59:16Z",
            "response": CLASSIFIED_RESPONSE,
            "done": true,
            "eval_count": 21
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ollama_client(&mock_server, "gemma3n:e2b");
    let text = client.invoke("Classify: win a prize").await.unwrap();
    assert_eq!(text, CLASSIFIED_RESPONSE);
}

#[tokio::test]
async fn ollama_server_error_is_service_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let client = ollama_client(&mock_server, "gemma3n:e2b");
    let error = client.invoke("hello").await.unwrap_err();
    assert!(matches!(error, ProviderError::ServiceUnavailable { .. }));
    assert!(error.to_string().contains("model not loaded"));
}

#[tokio::test]
async fn ollama_malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = ollama_client(&mock_server, "gemma3n:e2b");
    let error = client.invoke("hello").await.unwrap_err();
    assert!(matches!(error, ProviderError::InvalidResponse { .. }));
}

#[tokio::test]
async fn gemini_joins_text_parts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemma-3n-e4b-it:generateContent"))
        .and(header("x-goog-api-key", "test-google-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "##Classification: 'smishing'\n" },
                        { "text": "##Explanation: suspicious link" }
                    ]
                },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = gemini_client(&mock_server);
    let text = client.invoke("Classify this").await.unwrap();
    assert_eq!(text, CLASSIFIED_RESPONSE);
}

#[tokio::test]
async fn gemini_blocked_prompt_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemma-3n-e4b-it:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&mock_server)
        .await;

    let client = gemini_client(&mock_server);
    let error = client.invoke("Classify this").await.unwrap_err();
    assert!(matches!(error, ProviderError::InvalidResponse { .. }));
}

#[tokio::test]
async fn gemini_quota_exhausted_is_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemma-3n-e4b-it:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&mock_server)
        .await;

    let client = gemini_client(&mock_server);
    let error = client.invoke("Classify this").await.unwrap_err();
    assert!(matches!(error, ProviderError::RateLimited { .. }));
}

#[tokio::test]
async fn provider_client_dispatches_through_settings() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": CLASSIFIED_RESPONSE },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut settings = ProviderSettings::default();
    settings.openai.api_key = "sk-local".to_string();
    settings.openai.base_url = Some(Url::parse(&format!("{}/v1", mock_server.uri())).unwrap());

    let selector: ModelSelector = "openai:local-llama".parse().unwrap();
    let client = settings.build(&selector).unwrap();

    assert_eq!(client.kind(), ProviderKind::OpenAi);
    assert_eq!(client.model_name(), "local-llama");
    assert_eq!(client.invoke("Classify").await.unwrap(), CLASSIFIED_RESPONSE);
}
