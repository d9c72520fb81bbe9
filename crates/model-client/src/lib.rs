// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Model invocation seam for the evaluation harness
//!
//! This crate provides the abstraction the harness uses to talk to text
//! generation models without depending on any provider protocol.
//!
//! # Core Abstractions
//!
//! - **`ModelClient` Trait**: "given a rendered prompt, produce a text response or fail"
//! - **Error Handling**: `ProviderError` covering transport, quota and response failures
//!
//! Provider specific response shapes are normalized by the implementor, so
//! callers only ever see a plain `String` response.

use std::sync::Arc;

use thiserror::Error;

/// Generic trait for text generation models
///
/// Implementors bind one named model of one provider. The harness treats every
/// failure uniformly and never branches on the error variant.
pub trait ModelClient: Send + Sync {
    /// Name recorded in trial records (e.g. `gpt-4o`, `gemma3n:e2b`)
    fn model_name(&self) -> &str;

    /// Send the rendered prompt to the model and return its text response
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, rate limiting, exhausted quota,
    /// authentication problems or an unreadable response body
    fn invoke(&self, prompt: &str) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

impl<T: ModelClient> ModelClient for Arc<T> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn invoke(&self, prompt: &str) -> impl Future<Output = Result<String, ProviderError>> + Send {
        (**self).invoke(prompt)
    }
}

/// Common errors that can occur when invoking a model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {message}")]
    Http { message: String },

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Authentication failed
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Invalid response format
    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    /// Service unavailable
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network timeout
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}

impl ProviderError {
    /// Create an HTTP error
    pub fn http<T: ToString>(message: T) -> Self {
        Self::Http {
            message: message.to_string(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited<T: ToString>(message: T) -> Self {
        Self::RateLimited {
            message: message.to_string(),
        }
    }

    /// Create an authentication error
    pub fn authentication<T: ToString>(message: T) -> Self {
        Self::Authentication {
            message: message.to_string(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response<T: ToString>(message: T) -> Self {
        Self::InvalidResponse {
            message: message.to_string(),
        }
    }

    /// Create a service unavailable error
    pub fn service_unavailable<T: ToString>(message: T) -> Self {
        Self::ServiceUnavailable {
            message: message.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Map a non-success HTTP status to the matching error variant
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {body}");
        match status {
            401 | 403 => Self::authentication(message),
            408 => Self::Timeout { timeout_seconds: 0 },
            429 => Self::rate_limited(message),
            500..=599 => Self::service_unavailable(message),
            _ => Self::http(message),
        }
    }

    /// Check if this error indicates an authentication problem
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ProviderError::Authentication { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    impl ModelClient for EchoModel {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
            Ok(prompt.to_uppercase())
        }
    }

    #[tokio::test]
    async fn arc_delegates_to_inner_client() {
        let model = Arc::new(EchoModel);
        assert_eq!(model.model_name(), "echo");
        assert_eq!(model.invoke("hi").await.unwrap(), "HI");
    }

    #[test]
    fn status_mapping() {
        assert!(ProviderError::from_status(401, "").is_auth_error());
        assert!(ProviderError::from_status(403, "").is_auth_error());
        assert!(matches!(
            ProviderError::from_status(429, "slow down"),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(408, ""),
            ProviderError::Timeout { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(503, "maintenance"),
            ProviderError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(404, "no such model"),
            ProviderError::Http { .. }
        ));
    }

    #[test]
    fn error_display() {
        let error = ProviderError::rate_limited("quota exhausted");
        let display = error.to_string();
        assert!(display.contains("Rate limit exceeded"));
        assert!(display.contains("quota exhausted"));
    }
}
