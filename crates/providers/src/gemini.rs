// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Google Gemini / Gemma adapter
//!
//! Gemini returns a list of candidates, each made of content parts. The
//! adapter concatenates the text parts of the first candidate.

use model_client::{ModelClient, ProviderError};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::http::{build_client, endpoint, post_json, secret_header};

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-goog-api-key");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Google AI Studio API key
    pub api_key: String,
    /// Base URL for the API
    pub base_url: Option<Url>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            timeout_seconds: 60,
            temperature: Some(0.7),
        }
    }
}

impl GeminiConfig {
    /// Create a new Gemini configuration
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

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::config("Gemini API key cannot be empty"));
        }
        crate::validate_timeout(self.timeout_seconds)?;
        crate::validate_temperature(self.temperature)
    }
}

/// Client bound to one Gemini model
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    model: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new client for the given model
    pub fn new(config: GeminiConfig, model: impl Into<String>) -> Result<Self, ProviderError> {
        config.validate()?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_GEMINI_URL)
                .map_err(|e| ProviderError::config(format!("Invalid default URL: {e}")))?,
        };

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, secret_header("", &config.api_key)?);
        let client = build_client(config.timeout_seconds, headers)?;

        let model = model.into();
        info!(model = %model, base_url = %base_url, "Created Gemini client");

        Ok(Self {
            client,
            base_url,
            model,
            config,
        })
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            if let Some(feedback) = response.prompt_feedback {
                warn!(feedback = %feedback, "Prompt was blocked by the provider");
            }
            return Err(ProviderError::invalid_response("No candidates in response"));
        };

        debug!(finish_reason = ?candidate.finish_reason, "Received Gemini candidate");

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::invalid_response("Candidate has no text parts"));
        }
        Ok(text)
    }
}

impl ModelClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(provider = "gemini", model = %self.model))]
    async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: self
                .config
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let url = endpoint(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        )?;
        let response: GenerateContentResponse =
            post_json(&self.client, url, &request, self.config.timeout_seconds).await?;

        Self::extract_text(response)
    }
}
