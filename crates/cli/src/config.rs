// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Harness configuration
//!
//! Settings come from, in increasing precedence: built-in defaults,
//! `eval.json`, `eval.{ENVIRONMENT}.json`, then `EVAL_`-prefixed environment
//! variables with `__` between nested keys (`EVAL_RETRY__MAX_ATTEMPTS=5`,
//! `EVAL_OLLAMA__BASE_URL=http://gpu-box:11434`).

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use config::{
    Config, ConfigError, Environment as ConfigEnv, File, FileFormat, builder::DefaultState,
};
use harness::{HarnessResult, RetryPolicy, RunOptions};
use providers::{GeminiConfig, OllamaConfig, OpenAiConfig, ProviderSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fallback variable for the OpenAI API key
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
/// Fallback variable for the Google API key
pub const GOOGLE_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Retry settings for model calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per trial, first call included
    pub max_attempts: u32,
    /// Wait before the second attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Growth factor between waits
    pub backoff_multiplier: f64,
}

impl RetrySettings {
    /// Build the validated retry policy
    pub fn policy(&self) -> HarnessResult<RetryPolicy> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_multiplier,
        )
    }
}

/// Run scheduling and output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Cells in flight at once
    pub concurrency: usize,
    /// Directory for result files when no explicit path is given
    pub output_dir: PathBuf,
}

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Retry policy settings
    pub retry: RetrySettings,
    /// Run settings
    pub run: RunSettings,
    /// OpenAI-compatible provider
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Ollama provider
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Gemini provider
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl EvalConfig {
    /// Load configuration from files and the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::load().context("failed to load configuration")?;
        config.apply_key_fallbacks(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `eval.json`
    /// 3. `eval.{env}.json`, where `env` is `$ENVIRONMENT` or `development`
    /// 4. Environment variables with the `EVAL_` prefix
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = Self::defaults()?
            .add_source(File::with_name("eval.json").required(false))
            .add_source(
                File::with_name(&format!("eval.{}.json", env_var.to_lowercase())).required(false),
            )
            .add_source(
                ConfigEnv::with_prefix("EVAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        debug!(environment = %env_var, "Configuration sources loaded");
        config.try_deserialize()
    }

    /// Defaults overlaid with a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("retry.max_attempts", RetryPolicy::DEFAULT_MAX_ATTEMPTS)?
            .set_default("retry.initial_delay_ms", 2000)?
            .set_default(
                "retry.backoff_multiplier",
                RetryPolicy::DEFAULT_BACKOFF_MULTIPLIER,
            )?
            .set_default("run.concurrency", 1)?
            .set_default("run.output_dir", "results")
    }

    /// Fill empty API keys from the conventional provider variables
    pub fn apply_key_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.openai.api_key.is_empty() {
            if let Some(key) = lookup(OPENAI_KEY_VAR) {
                self.openai.api_key = key;
            }
        }
        if self.gemini.api_key.is_empty() {
            if let Some(key) = lookup(GOOGLE_KEY_VAR) {
                self.gemini.api_key = key;
            }
        }
    }

    /// Check the retry and run settings
    ///
    /// Provider sections are checked when a model of that provider is built,
    /// so unused providers need no credentials.
    pub fn validate(&self) -> Result<()> {
        self.run_options(None).context("invalid configuration")?;
        Ok(())
    }

    /// Run options, with an optional concurrency override
    pub fn run_options(&self, concurrency: Option<usize>) -> HarnessResult<RunOptions> {
        RunOptions::new(
            self.retry.policy()?,
            concurrency.unwrap_or(self.run.concurrency),
        )
    }

    /// Provider sections as one settings value
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            openai: self.openai.clone(),
            ollama: self.ollama.clone(),
            gemini: self.gemini.clone(),
        }
    }
}
