// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider selection and dispatch
//!
//! Models are selected on the command line as `provider:model` strings. The
//! [`ProviderSettings`] hold one configuration section per provider and turn a
//! [`ModelSelector`] into a ready [`ProviderClient`].

use std::{fmt, str::FromStr};

use model_client::{ModelClient, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GeminiClient, GeminiConfig, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig};

/// Supported provider bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI or any OpenAI-compatible server
    OpenAi,
    /// Local Ollama server
    Ollama,
    /// Google Gemini / Gemma API
    Gemini,
}

impl ProviderKind {
    /// Identifier used in model selectors
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(ProviderError::config(format!(
                "Unknown provider '{other}' (expected openai, ollama or gemini)"
            ))),
        }
    }
}

/// A `provider:model` pair naming one model to evaluate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSelector {
    provider: ProviderKind,
    model: String,
}

impl ModelSelector {
    /// Create a new selector
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Result<Self, ProviderError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ProviderError::config("Model name cannot be empty"));
        }
        Ok(Self { provider, model })
    }

    /// Get the provider
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Get the provider-side model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

impl FromStr for ModelSelector {
    type Err = ProviderError;

    /// Parse `provider:model`; only the first colon separates the two, so
    /// Ollama tags such as `ollama:gemma3n:e2b` keep their own colon
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s.split_once(':').ok_or_else(|| {
            ProviderError::config(format!(
                "Invalid model selector '{s}' (expected provider:model)"
            ))
        })?;
        Self::new(provider.parse()?, model.trim())
    }
}

/// Per-provider configuration sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// OpenAI-compatible settings
    pub openai: OpenAiConfig,
    /// Ollama settings
    pub ollama: OllamaConfig,
    /// Gemini settings
    pub gemini: GeminiConfig,
}

impl ProviderSettings {
    /// Build a client for the selected model
    pub fn build(&self, selector: &ModelSelector) -> Result<ProviderClient, ProviderError> {
        debug!(selector = %selector, "Building provider client");

        let client = match selector.provider() {
            ProviderKind::OpenAi => {
                ProviderClient::OpenAi(OpenAiClient::new(self.openai.clone(), selector.model())?)
            }
            ProviderKind::Ollama => {
                ProviderClient::Ollama(OllamaClient::new(self.ollama.clone(), selector.model())?)
            }
            ProviderKind::Gemini => {
                ProviderClient::Gemini(GeminiClient::new(self.gemini.clone(), selector.model())?)
            }
        };
        Ok(client)
    }
}

/// Any of the supported provider clients
#[derive(Debug, Clone)]
pub enum ProviderClient {
    /// OpenAI-compatible chat model
    OpenAi(OpenAiClient),
    /// Ollama model
    Ollama(OllamaClient),
    /// Gemini model
    Gemini(GeminiClient),
}

impl ProviderClient {
    /// Provider this client talks to
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::OpenAi(_) => ProviderKind::OpenAi,
            ProviderClient::Ollama(_) => ProviderKind::Ollama,
            ProviderClient::Gemini(_) => ProviderKind::Gemini,
        }
    }
}

impl ModelClient for ProviderClient {
    fn model_name(&self) -> &str {
        match self {
            ProviderClient::OpenAi(client) => client.model_name(),
            ProviderClient::Ollama(client) => client.model_name(),
            ProviderClient::Gemini(client) => client.model_name(),
        }
    }

    async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            ProviderClient::OpenAi(client) => client.invoke(prompt).await,
            ProviderClient::Ollama(client) => client.invoke(prompt).await,
            ProviderClient::Gemini(client) => client.invoke(prompt).await,
        }
    }
}
