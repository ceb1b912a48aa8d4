//! Completion model backend.
//!
//! Provides the `CompletionModel` trait and an OpenAI-compatible HTTP
//! implementation. The intent extractor owns prompts and parsing; this
//! crate only moves text to and from the model.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors from completion model calls.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Completion model is not configured")]
    NotConfigured,
}

/// Single-turn text completion.
///
/// Auth, transport retries and rate limiting are the implementation's
/// concern; callers see one request and one answer.
pub trait CompletionModel: Send + Sync {
    /// Complete `user_text` under `system_prompt`.
    fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        temperature: f32,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;

    /// Check if the model endpoint is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), CompletionError>> + Send;

    /// Get the backend name for logging.
    fn name(&self) -> &'static str;
}

/// OpenAI-compatible endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Base URL; `/v1/chat/completions` is appended
    pub base_url: String,
    /// Model name sent with every request
    pub model: String,
    /// Bearer token, if the endpoint needs one
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    /// A remote call is only worth attempting with a key or a non-default
    /// (typically local) endpoint.
    pub fn is_usable(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            || self.base_url != Self::default().base_url
    }
}

/// OpenAI-compatible chat completion client. Works with any server that
/// implements `/v1/chat/completions`.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn build_body(&self, system_prompt: &str, user_text: &str, temperature: f32) -> Value {
        json!({
            "model": self.config.model,
            "temperature": temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_text },
            ],
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Pull the first choice's message content out of a chat completion body.
fn parse_completion(body: &Value) -> Result<String, CompletionError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| CompletionError::Parse("Missing choices[0].message.content".to_string()))
}

impl CompletionModel for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let body = self.build_body(system_prompt, user_text, temperature);

        tracing::debug!(
            model = %self.config.model,
            chars = user_text.len(),
            "Requesting completion"
        );

        let response = self
            .authorize(self.client.post(self.endpoint("/v1/chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::Connection(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value =
            serde_json::from_str(&text).map_err(|e| CompletionError::Parse(e.to_string()))?;

        parse_completion(&json)
    }

    async fn health_check(&self) -> Result<(), CompletionError> {
        let response = self
            .authorize(self.client.get(self.endpoint("/v1/models")))
            .send()
            .await
            .map_err(|e| CompletionError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CompletionError::Api {
                status: response.status().as_u16(),
                body: String::new(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Stand-in used when no endpoint is configured. Every call fails, which
/// sends the intent extractor straight to its offline classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledModel;

impl CompletionModel for DisabledModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_text: &str,
        _temperature: f32,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::NotConfigured)
    }

    async fn health_check(&self) -> Result<(), CompletionError> {
        Err(CompletionError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Either a real client or the disabled stand-in, chosen from configuration.
pub enum ConfiguredModel {
    OpenAi(OpenAiClient),
    Disabled(DisabledModel),
}

impl ConfiguredModel {
    pub fn from_config(config: OpenAiConfig) -> Result<Self, CompletionError> {
        if config.is_usable() {
            Ok(Self::OpenAi(OpenAiClient::new(config)?))
        } else {
            Ok(Self::Disabled(DisabledModel))
        }
    }
}

impl CompletionModel for ConfiguredModel {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        match self {
            Self::OpenAi(client) => client.complete(system_prompt, user_text, temperature).await,
            Self::Disabled(model) => model.complete(system_prompt, user_text, temperature).await,
        }
    }

    async fn health_check(&self) -> Result<(), CompletionError> {
        match self {
            Self::OpenAi(client) => client.health_check().await,
            Self::Disabled(model) => model.health_check().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(client) => client.name(),
            Self::Disabled(model) => model.name(),
        }
    }
}
