// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Ollama adapter for locally served models

use model_client::{ModelClient, ProviderError};
use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::http::{build_client, endpoint, post_json};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    pub base_url: Option<Url>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 120,
            temperature: Some(0.7),
        }
    }
}

impl OllamaConfig {
    /// Set the server base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        crate::validate_timeout(self.timeout_seconds)?;
        crate::validate_temperature(self.temperature)
    }
}

/// Client bound to one model served by Ollama
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: Url,
    model: String,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new client for the given model
    pub fn new(config: OllamaConfig, model: impl Into<String>) -> Result<Self, ProviderError> {
        config.validate()?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_OLLAMA_URL)
                .map_err(|e| ProviderError::config(format!("Invalid default URL: {e}")))?,
        };
        let client = build_client(config.timeout_seconds, HeaderMap::new())?;

        let model = model.into();
        info!(model = %model, base_url = %base_url, "Created Ollama client");

        Ok(Self {
            client,
            base_url,
            model,
            config,
        })
    }
}

impl ModelClient for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(provider = "ollama", model = %self.model))]
    async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self
                .config
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        };

        let url = endpoint(&self.base_url, "api/generate")?;
        let response: GenerateResponse =
            post_json(&self.client, url, &request, self.config.timeout_seconds).await?;

        debug!(
            done = response.done,
            eval_count = ?response.eval_count,
            "Received Ollama generation"
        );

        Ok(response.response)
    }
}
