//! OpenAI chat-completions provider (the direct-api tier)

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::types::{ConversationTurn, TurnRole};

use super::types::{CompletionOptions, CompletionProvider};

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature: 0.7,
            max_tokens: 500,
        })
    }

    /// Default temperature when a call does not specify one
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Default max tokens when a call does not specify one
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Convert turns to OpenAI wire format. The advisor is the `user`, the
    /// simulated client is the `assistant`; history system turns are dropped.
    fn to_openai_messages(system: &str, turns: &[ConversationTurn]) -> Vec<OpenAiMessage> {
        let mut result = vec![OpenAiMessage {
            role: "system".to_string(),
            content: system.to_string(),
        }];

        for turn in turns {
            let role = match turn.role {
                TurnRole::System => continue,
                TurnRole::Advisor => "user",
                TurnRole::Client => "assistant",
            };
            result.push(OpenAiMessage {
                role: role.to_string(),
                content: turn.text.clone(),
            });
        }

        result
    }

    fn from_openai_response(resp: OpenAiApiResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI response had no choices"))?;

        if let Some(usage) = resp.usage {
            debug!(
                "OpenAI usage: prompt={} completion={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        turns: &[ConversationTurn],
        options: &CompletionOptions,
    ) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let messages = Self::to_openai_messages(system, turns);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": options.temperature.unwrap_or(self.temperature),
            "max_tokens": options.max_tokens.unwrap_or(self.max_tokens),
        });

        if options.json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        debug!(
            "OpenAI request: model={}, messages={}",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OpenAiApiResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        debug!(
            "OpenAI response: choices={}, finish_reason={:?}",
            api_response.choices.len(),
            api_response.choices.first().map(|c| &c.finish_reason)
        );

        Self::from_openai_response(api_response)
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiApiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test-key".to_string(),
            "gpt-4o".to_string(),
            base_url.to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_to_openai_messages_maps_roles() {
        let turns = vec![
            ConversationTurn::system("ignored"),
            ConversationTurn::advisor("Hi"),
            ConversationTurn::client("Hello, I'm Jane."),
        ];
        let result = OpenAiProvider::to_openai_messages("You are Jane.", &turns);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].role, "system");
        assert_eq!(result[0].content, "You are Jane.");
        assert_eq!(result[1].role, "user");
        assert_eq!(result[2].role, "assistant");
    }

    #[test]
    fn test_from_openai_response_no_choices() {
        let resp = OpenAiApiResponse {
            choices: vec![],
            usage: None,
        };
        assert!(OpenAiProvider::from_openai_response(resp).is_err());
    }

    #[test]
    fn test_openai_provider_debug_hides_key() {
        let provider = test_provider("https://api.openai.com");
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-test-key"));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello, I'm Jane."},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let text = provider
            .complete(
                "system",
                &[ConversationTurn::advisor("Hi")],
                &CompletionOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(text, "Hello, I'm Jane.");
    }

    #[tokio::test]
    async fn test_complete_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider
            .complete("system", &[], &CompletionOptions::default())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_complete_requests_json_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"},
                "temperature": 0.3,
                "max_tokens": 500
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"rapport\": 20}"}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let text = provider
            .complete("system", &[], &CompletionOptions::new(0.3, 500).json())
            .await
            .unwrap();
        assert_eq!(text, "{\"rapport\": 20}");
    }
}
