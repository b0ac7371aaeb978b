//! Chat completion providers.
//!
//! Implements [`ChatModel`] for the OpenAI chat completions API. Requests go
//! through [`crate::http::post_json`], so rate limits and server errors are
//! retried with the same backoff as embedding calls.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use libran_core::llm::{truncate_at_stop, ChatMessage, ChatModel, Role};

use crate::config::{self, LlmConfig};
use crate::http;

/// Chat model used when `llm.provider = "disabled"`.
pub struct DisabledChat;

#[async_trait]
impl ChatModel for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[ChatMessage], _stop: &[&str]) -> Result<String> {
        bail!("LLM provider is disabled")
    }
}

/// OpenAI chat completions (`POST /v1/chat/completions`).
pub struct OpenAIChat {
    model: String,
    temperature: f32,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig, api_key: Option<&str>) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(config::OPENAI_API_BASE);
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config::openai_api_key(api_key)?,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], stop: &[&str]) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if !stop.is_empty() {
            // The API accepts at most four stop sequences.
            body["stop"] = serde_json::json!(stop.iter().take(4).collect::<Vec<_>>());
        }

        let json = http::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;

        let content = parse_chat_response(&json)?;
        Ok(truncate_at_stop(&content, stop).to_string())
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Create the configured [`ChatModel`]. `api_key` overrides `OPENAI_API_KEY`.
pub fn create_chat_model(config: &LlmConfig, api_key: Option<&str>) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledChat)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config, api_key)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let json = serde_json::json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Final Answer: yes" } }
            ]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Final Answer: yes");
    }

    #[test]
    fn missing_choices_is_error() {
        let json = serde_json::json!({ "error": { "message": "quota" } });
        assert!(parse_chat_response(&json).is_err());
    }

    #[tokio::test]
    async fn disabled_chat_errors() {
        let mut config = LlmConfig::default();
        config.provider = "disabled".to_string();
        let chat = create_chat_model(&config, None).unwrap();
        assert!(chat.complete(&[ChatMessage::user("hi")], &[]).await.is_err());
    }
}
