//! Direct completion abstraction

use anyhow::Result;
use async_trait::async_trait;

use crate::types::ConversationTurn;

/// Per-call sampling options. `None` falls back to the provider's configured default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the endpoint for a JSON object instead of free text
    pub json_output: bool,
}

impl CompletionOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            json_output: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Stateless request/response LLM call. No memory is retained between calls.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai")
    fn provider_name(&self) -> &str;

    /// Model identifier (e.g. "gpt-4o")
    fn model(&self) -> &str;

    /// Complete the conversation under the given system prompt, returning the reply text
    async fn complete(
        &self,
        system: &str,
        turns: &[ConversationTurn],
        options: &CompletionOptions,
    ) -> Result<String>;
}
