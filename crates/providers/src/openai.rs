// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! OpenAI-compatible chat completion adapter
//!
//! Works against the official API as well as any server exposing the
//! `/chat/completions` endpoint (vLLM, LM Studio, llama.cpp server).

use model_client::{ModelClient, ProviderError};
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::http::{build_client, endpoint, post_json, secret_header};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";

/// OpenAI Chat Completion API request
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// A single message in the chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI Chat Completion API response
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Deserialize)]
struct TokenUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// OpenAI API key
    pub api_key: String,
    /// Base URL for the API (defaults to the official endpoint)
    pub base_url: Option<Url>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of tokens in the response
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            timeout_seconds: 60,
            max_tokens: None,
            temperature: Some(0.7),
        }
    }
}

impl OpenAiConfig {
    /// Create a new OpenAI configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the base URL for the API
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::config("OpenAI API key cannot be empty"));
        }
        crate::validate_timeout(self.timeout_seconds)?;
        crate::validate_temperature(self.temperature)
    }
}

/// Client bound to one OpenAI-compatible chat model
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: Url,
    model: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client for the given model
    pub fn new(config: OpenAiConfig, model: impl Into<String>) -> Result<Self, ProviderError> {
        config.validate()?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_API_URL)
                .map_err(|e| ProviderError::config(format!("Invalid default URL: {e}")))?,
        };

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, secret_header("Bearer ", &config.api_key)?);
        let client = build_client(config.timeout_seconds, headers)?;

        let model = model.into();
        info!(model = %model, base_url = %base_url, "Created OpenAI-compatible client");

        Ok(Self {
            client,
            base_url,
            model,
            config,
        })
    }

    fn extract_text(response: ChatCompletionResponse) -> Result<String, ProviderError> {
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Token usage statistics"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response("No choices in completion response"))?;

        debug!(finish_reason = ?choice.finish_reason, "Received completion choice");

        choice
            .message
            .content
            .ok_or_else(|| ProviderError::invalid_response("Completion choice has no content"))
    }
}

impl ModelClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(provider = "openai", model = %self.model))]
    async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let url = endpoint(&self.base_url, "chat/completions")?;
        let response: ChatCompletionResponse =
            post_json(&self.client, url, &request, self.config.timeout_seconds).await?;

        Self::extract_text(response)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_234_567_890,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 50,
                "completion_tokens": 12,
                "total_tokens": 62
            }
        })
    }

    async fn client_for(mock_server: &MockServer, api_key: &str) -> OpenAiClient {
        let base_url = Url::parse(&mock_server.uri()).unwrap();
        OpenAiClient::new(OpenAiConfig::new(api_key).with_base_url(base_url), "gpt-4o").unwrap()
    }

    #[test]
    fn config_validation() {
        assert!(OpenAiConfig::new("sk-test").validate().is_ok());
        assert!(OpenAiConfig::new("").validate().is_err());

        let mut config = OpenAiConfig::new("sk-test");
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let config = OpenAiConfig::new("sk-test").with_temperature(3.5);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn successful_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Classify this"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("##Classification: 'benign'")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, "sk-test-key").await;
        assert_eq!(client.model_name(), "gpt-4o");

        let text = client.invoke("Classify this").await.unwrap();
        assert_eq!(text, "##Classification: 'benign'");
    }

    #[tokio::test]
    async fn authentication_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {
                    "message": "Invalid API key",
                    "type": "invalid_request_error",
                    "code": "invalid_api_key"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, "sk-invalid").await;
        let error = client.invoke("Classify this").await.unwrap_err();
        assert!(error.is_auth_error());
    }

    #[tokio::test]
    async fn rate_limit_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, "sk-test-key").await;
        let error = client.invoke("Classify this").await.unwrap_err();
        assert!(matches!(error, ProviderError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn empty_choices_are_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, "sk-test-key").await;
        let error = client.invoke("Classify this").await.unwrap_err();
        assert!(matches!(error, ProviderError::InvalidResponse { .. }));
    }
}
