// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Text generation provider adapters
//!
//! This crate provides implementations of the `ModelClient` trait for the
//! providers the harness can evaluate against. Each adapter normalizes its
//! provider's response shape into a single response string, so nothing
//! downstream ever sees provider-specific structures.
//!
//! # Architecture
//!
//! - **Client Implementations**: [`openai`], [`ollama`], [`gemini`]
//! - **Dispatch**: [`registry::ProviderClient`] wraps any of them behind one type,
//!   [`registry::ModelSelector`] parses `provider:model` strings
//!
//! Adapters make exactly one request per `invoke`; retries belong to the harness.

pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;
pub mod registry;

pub use gemini::{GeminiClient, GeminiConfig};
use model_client::ProviderError;
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use registry::{ModelSelector, ProviderClient, ProviderKind, ProviderSettings};

/// Request timeouts accepted by every adapter, in seconds
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

fn validate_timeout(timeout_seconds: u64) -> Result<(), ProviderError> {
    if TIMEOUT_RANGE.contains(&timeout_seconds) {
        Ok(())
    } else {
        Err(ProviderError::config(format!(
            "Invalid timeout: {timeout_seconds} seconds (must be 1-300)"
        )))
    }
}

fn validate_temperature(temperature: Option<f32>) -> Result<(), ProviderError> {
    match temperature {
        Some(t) if !(0.0..=2.0).contains(&t) => Err(ProviderError::config(format!(
            "Invalid temperature: {t} (must be 0.0-2.0)"
        ))),
        _ => Ok(()),
    }
}
