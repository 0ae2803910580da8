/// LLM Client — every remote text-generation call in Tailor goes through here.
///
/// One `LlmClient` implementation per provider (OpenAI, Claude, Gemini, Ollama), each
/// built by an `LlmFactory` with the model id and temperature fixed at
/// construction. Callers never see provider wire formats.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod prompts;

use crate::config::Config;

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("no credentials configured for provider '{0}'")]
    MissingCredentials(Provider),

    #[error("provider '{0}' does not generate text")]
    NoTextGeneration(Provider),

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Provider selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(alias = "anthropic")]
    Claude,
    #[serde(alias = "google")]
    Gemini,
    Ollama,
    /// No LLM: only hardcode and skip modes are usable.
    None,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
            Provider::None => "none",
        }
    }

    /// Model used when a request does not name one.
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Claude => "claude-sonnet-4-5",
            Provider::Gemini => "gemini-1.5-flash",
            Provider::Ollama => "llama3.1",
            Provider::None => "verbatim",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "claude" | "anthropic" => Ok(Provider::Claude),
            "gemini" | "google" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            "none" | "" => Ok(Provider::None),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

/// Per-run model configuration captured by a client at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Backoff for retryable statuses: `base_delay`, then doubled, up to
/// `max_attempts` sends in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before the given attempt (attempt 0 is the first send).
    fn delay(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => self.base_delay * (1 << (n - 1)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// A configured text-generation endpoint.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one system + user message pair and returns the raw reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    fn provider(&self) -> Provider;

    fn model(&self) -> &str;
}

/// Builds clients per run, so each run can pick its own provider and model.
pub trait LlmFactory: Send + Sync {
    fn build(
        &self,
        provider: Provider,
        settings: ModelSettings,
    ) -> Result<Arc<dyn LlmClient>, LlmError>;
}

/// Production factory: real HTTP clients, credentials from `Config`.
pub struct HttpLlmFactory {
    http: Client,
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    gemini_api_key: Option<String>,
    ollama_url: String,
}

impl HttpLlmFactory {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            http: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            openai_api_key: config.openai_api_key.clone(),
            anthropic_api_key: config.anthropic_api_key.clone(),
            gemini_api_key: config.gemini_api_key.clone(),
            ollama_url: config.ollama_url.clone(),
        })
    }

    /// Providers that can be used with the current credentials.
    pub fn available_providers(&self) -> Vec<Provider> {
        let mut providers = Vec::new();
        if self.openai_api_key.is_some() {
            providers.push(Provider::OpenAi);
        }
        if self.anthropic_api_key.is_some() {
            providers.push(Provider::Claude);
        }
        if self.gemini_api_key.is_some() {
            providers.push(Provider::Gemini);
        }
        providers.push(Provider::Ollama);
        providers
    }
}

impl LlmFactory for HttpLlmFactory {
    fn build(
        &self,
        provider: Provider,
        settings: ModelSettings,
    ) -> Result<Arc<dyn LlmClient>, LlmError> {
        let client: Arc<dyn LlmClient> = match provider {
            Provider::OpenAi => {
                let key = self
                    .openai_api_key
                    .clone()
                    .ok_or(LlmError::MissingCredentials(provider))?;
                Arc::new(openai::OpenAiClient::new(self.http.clone(), key, settings))
            }
            Provider::Claude => {
                let key = self
                    .anthropic_api_key
                    .clone()
                    .ok_or(LlmError::MissingCredentials(provider))?;
                Arc::new(anthropic::ClaudeClient::new(self.http.clone(), key, settings))
            }
            Provider::Gemini => {
                let key = self
                    .gemini_api_key
                    .clone()
                    .ok_or(LlmError::MissingCredentials(provider))?;
                Arc::new(gemini::GeminiClient::new(self.http.clone(), key, settings))
            }
            Provider::Ollama => Arc::new(ollama::OllamaClient::new(
                self.http.clone(),
                &self.ollama_url,
                settings,
            )),
            Provider::None => return Err(LlmError::NoTextGeneration(provider)),
        };
        Ok(client)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared transport helpers
// ────────────────────────────────────────────────────────────────────────────

/// Sends the request built by `build`, retrying on 429 and 5xx with
/// exponential backoff (1s, 2s by default). Other non-success statuses fail immediately.
pub(crate) async fn send_with_retry<F>(retry: &RetryPolicy, build: F) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..retry.max_attempts {
        if attempt > 0 {
            let delay = retry.delay(attempt);
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        return Ok(response);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: retry.max_attempts,
    }))
}

/// Pulls a human-readable message out of an error body.
/// Handles `{"error": {"message": ..}}` (OpenAI, Anthropic) and `{"error": ".."}` (Ollama).
fn api_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    match value.get("error") {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        None => body.to_string(),
    }
}

/// Strips ```lang ... ``` or ``` ... ``` fences that models like to wrap output in.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as `latex` or `text` on the opening line.
    let body = match stripped.find('\n') {
        Some(newline) if !stripped[..newline].contains(' ') => &stripped[newline + 1..],
        _ => stripped,
    };
    body.trim_end()
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or(body.trim())
}
