//! OpenAI Chat Completions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_with_retry, LlmClient, LlmError, ModelSettings, Provider, RetryPolicy};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

pub struct OpenAiClient {
    http: Client,
    api_key: String,
    url: String,
    settings: ModelSettings,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(http: Client, api_key: String, settings: ModelSettings) -> Self {
        Self {
            http,
            api_key,
            url: OPENAI_API_URL.to_string(),
            settings,
            retry: RetryPolicy::default(),
        }
    }

    /// Points the client at an OpenAI-compatible endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = send_with_retry(&self.retry, || {
            self.http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
        })
        .await?;

        let body: ChatResponse = response.json().await?;

        if let Some(usage) = &body.usage {
            debug!(
                "OpenAI call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                self.settings.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        body.into_text().ok_or(LlmError::EmptyContent)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
