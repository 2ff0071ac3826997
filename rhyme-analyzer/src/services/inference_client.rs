//! External inference service client
//!
//! The pipeline only depends on [`InferenceClient`]. [`AnthropicClient`] is the
//! production implementation, talking to the Anthropic Messages API.
//!
//! Calls are never retried here; the caller decides what a failure means.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use rhyme_common::config::{resolve_api_key, InferenceConfig};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use crate::models::AnalysisScheme;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("rhyme-analyzer/", env!("CARGO_PKG_VERSION"));

/// Inference call failures
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The service throttled the call (HTTP 429)
    #[error("Inference service rate limited the request: {0}")]
    RateLimited(String),

    /// Credentials were rejected (HTTP 401/403)
    #[error("Inference service rejected credentials: {0}")]
    AuthFailure(String),

    /// Timeout, connection failure or 5xx
    #[error("Inference service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Inference call failed: {0}")]
    Unknown(String),
}

impl InferenceError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            429 => InferenceError::RateLimited(body),
            401 | 403 => InferenceError::AuthFailure(format!("HTTP {}", status.as_u16())),
            500..=599 => InferenceError::ServiceUnavailable(format!("HTTP {}: {}", status.as_u16(), body)),
            code => InferenceError::Unknown(format!("HTTP {}: {}", code, body)),
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            InferenceError::ServiceUnavailable(err.to_string())
        } else if let Some(status) = err.status() {
            InferenceError::from_status(status, err.to_string())
        } else {
            InferenceError::Unknown(err.to_string())
        }
    }
}

/// One call per window: window text plus scheme instructions in, raw text out
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn call(
        &self,
        window_text: &str,
        scheme: AnalysisScheme,
        instructions: &str,
    ) -> Result<String, InferenceError>;
}

// ============================================================================
// Anthropic Messages API
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// Concatenated text of all text blocks
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Anthropic Messages API client
///
/// Outbound calls are paced by a process-wide quota so concurrent requests
/// cannot exceed the account's request budget.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl AnthropicClient {
    /// Create a client from inference settings and an explicit API key
    pub fn new(config: &InferenceConfig, api_key: String) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| InferenceError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter =
            NonZeroU32::new(config.requests_per_minute).map(|n| RateLimiter::direct(Quota::per_minute(n)));

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            rate_limiter,
        })
    }

    /// Create a client resolving the API key from ENV → TOML
    pub fn from_config(config: &InferenceConfig) -> rhyme_common::Result<Self> {
        let api_key = resolve_api_key(config)?;
        Self::new(config, api_key).map_err(|e| rhyme_common::Error::Config(e.to_string()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceClient for AnthropicClient {
    async fn call(
        &self,
        window_text: &str,
        scheme: AnalysisScheme,
        instructions: &str,
    ) -> Result<String, InferenceError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: instructions,
            messages: [Message {
                role: "user",
                content: window_text,
            }],
        };

        tracing::debug!(
            scheme = %scheme,
            chars = window_text.chars().count(),
            "Calling inference service"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::from_status(status, body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Unknown(format!("Undecodable response: {}", e)))?;

        Ok(parsed.text())
    }
}
