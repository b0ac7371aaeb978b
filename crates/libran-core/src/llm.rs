//! Chat model trait and message types.
//!
//! Concrete providers live in the `libran-gpt` app crate.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A hosted chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Complete a conversation. Generation halts before any of the `stop`
    /// sequences; the returned text never contains them.
    async fn complete(&self, messages: &[ChatMessage], stop: &[&str]) -> Result<String>;
}

/// Cut `text` at the earliest occurrence of any stop sequence.
///
/// Providers apply stop sequences server-side; this is used as a fallback for
/// backends that ignore them.
pub fn truncate_at_stop<'a>(text: &'a str, stop: &[&str]) -> &'a str {
    let end = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s))
        .min()
        .unwrap_or(text.len());
    &text[..end]
}
