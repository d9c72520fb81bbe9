// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP plumbing shared by the provider adapters

use std::time::{Duration, Instant};

use model_client::ProviderError;
use reqwest::{
    Client, ClientBuilder,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;
use uuid::Uuid;

const USER_AGENT: &str = "smishing-eval/0.1.0";

/// Build a reqwest client with JSON defaults and the given extra headers
pub(crate) fn build_client(
    timeout_seconds: u64,
    mut headers: HeaderMap,
) -> Result<Client, ProviderError> {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))
}

/// Build a header value from a secret, rejecting empty or malformed keys
pub(crate) fn secret_header(prefix: &str, key: &str) -> Result<HeaderValue, ProviderError> {
    if key.trim().is_empty() {
        return Err(ProviderError::config("API key cannot be empty"));
    }
    let mut header = HeaderValue::from_str(&format!("{prefix}{key}"))
        .map_err(|e| ProviderError::config(format!("Invalid API key format: {e}")))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Join a relative endpoint onto a base URL, keeping the base path
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Result<Url, ProviderError> {
    let mut base_url = base_url.clone();
    if !base_url.path().ends_with('/') {
        base_url.set_path(&format!("{}/", base_url.path()));
    }
    base_url
        .join(path)
        .map_err(|e| ProviderError::config(format!("Invalid base URL: {e}")))
}

/// POST a JSON body and decode a JSON response, mapping every failure
pub(crate) async fn post_json<Req, Resp>(
    client: &Client,
    url: Url,
    body: &Req,
    timeout_seconds: u64,
) -> Result<Resp, ProviderError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    debug!(request_id = %request_id, url = %url, "Sending model request");

    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(&e, timeout_seconds))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(&e, timeout_seconds))?;

    debug!(
        request_id = %request_id,
        status = status.as_u16(),
        duration_ms = start_time.elapsed().as_millis(),
        "Model request completed"
    );

    if !status.is_success() {
        return Err(ProviderError::from_status(status.as_u16(), &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| ProviderError::invalid_response(format!("Failed to parse response: {e}")))
}

/// Convert a reqwest error into a provider error
fn transport_error(err: &reqwest::Error, timeout_seconds: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(timeout_seconds)
    } else if let Some(status) = err.status() {
        ProviderError::from_status(status.as_u16(), &err.to_string())
    } else {
        ProviderError::http(err.to_string())
    }
}
