//! Conversation buffer memory.
//!
//! An ordered, append-only log of question/answer turns. The whole log is
//! rendered into every agent prompt so follow-up questions can refer to
//! earlier ones. Nothing is ever evicted; the buffer lives as long as the
//! session that owns it.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const HUMAN_PREFIX: &str = "Human";
pub const AI_PREFIX: &str = "AI";

/// One question and the answer given to it.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub human: String,
    pub ai: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationBuffer {
    turns: Vec<Turn>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed turn.
    pub fn save(&mut self, human: impl Into<String>, ai: impl Into<String>) {
        self.turns.push(Turn {
            human: human.into(),
            ai: ai.into(),
            at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Render the log as `Human: ...` / `AI: ...` lines.
    pub fn buffer(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}\n{}: {}", HUMAN_PREFIX, t.human, AI_PREFIX, t.ai))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
