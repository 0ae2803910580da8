//! Local models served by Ollama (`/api/chat`, non-streaming).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{send_with_retry, LlmClient, LlmError, ModelSettings, Provider, RetryPolicy};

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: [OllamaMessage<'a>; 2],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

pub struct OllamaClient {
    http: Client,
    url: String,
    settings: ModelSettings,
    retry: RetryPolicy,
}

impl OllamaClient {
    pub fn new(http: Client, base_url: &str, settings: ModelSettings) -> Self {
        Self {
            http,
            url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            settings,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request_body = OllamaRequest {
            model: &self.settings.model,
            messages: [
                OllamaMessage {
                    role: "system",
                    content: system,
                },
                OllamaMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };

        let response =
            send_with_retry(&self.retry, || self.http.post(&self.url).json(&request_body))
                .await?;
        let body: OllamaResponse = response.json().await?;

        if body.message.content.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(body.message.content)
    }

    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(Client::new(), &server.uri(), ModelSettings::new("llama3.1", 0.1))
            .with_retry(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(5),
            })
    }

    #[tokio::test]
    async fn test_complete_posts_to_chat_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.1",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "Backend engineer."},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).complete("s", "u").await.unwrap();
        assert_eq!(reply, "Backend engineer.");
    }

    #[tokio::test]
    async fn test_empty_message_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": ""}
            })))
            .mount(&server)
            .await;

        let err = client(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model 'llama3.1' not found"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(
            err,
            LlmError::Api { status: 404, ref message } if message == "model 'llama3.1' not found"
        ));
    }

    #[test]
    fn test_chat_url_tolerates_trailing_slash() {
        let client = OllamaClient::new(
            Client::new(),
            "http://localhost:11434/",
            ModelSettings::new("llama3.1", 0.1),
        );
        assert_eq!(client.url, "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_request_disables_streaming() {
        let request = OllamaRequest {
            model: "llama3.1",
            messages: [
                OllamaMessage {
                    role: "system",
                    content: "s",
                },
                OllamaMessage {
                    role: "user",
                    content: "u",
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: 0.2,
                num_predict: 2048,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 2048);
        assert_eq!(json["messages"][1]["content"], "u");
    }
}
