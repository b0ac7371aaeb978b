//! Conversational agent with a single document QA tool.
//!
//! The agent alternates model calls and tool calls until the model produces
//! a `Final Answer:` or the iteration limit is reached. The conversation
//! buffer is rendered into every prompt so follow-up questions resolve
//! against earlier turns.

use std::sync::Arc;
use thiserror::Error;

use libran_core::llm::{ChatMessage, ChatModel};
use libran_core::memory::ConversationBuffer;
use libran_core::prompt::{
    agent_prompt, extend_scratchpad, parse_agent_output, AgentStep, ParseError, ToolSpec,
    AGENT_STOP,
};

use crate::qa::RetrievalQa;

pub const QA_TOOL_NAME: &str = "Document QA System";
pub const QA_TOOL_DESCRIPTION: &str = "Useful for when you need to answer questions about the \
aspects asked. Input may be a partial or fully formed question.";

/// Answer returned when the loop runs out of iterations.
pub const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("model call failed: {0:#}")]
    Model(anyhow::Error),
    #[error("{tool} failed: {error:#}")]
    Tool { tool: String, error: anyhow::Error },
}

pub struct AgentExecutor {
    chat: Arc<dyn ChatModel>,
    qa: Arc<RetrievalQa>,
    tools: Vec<ToolSpec>,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(chat: Arc<dyn ChatModel>, qa: Arc<RetrievalQa>, max_iterations: usize) -> Self {
        Self {
            chat,
            qa,
            tools: vec![ToolSpec {
                name: QA_TOOL_NAME.to_string(),
                description: QA_TOOL_DESCRIPTION.to_string(),
            }],
            max_iterations: max_iterations.max(1),
        }
    }

    /// Answer `input` given the conversation so far. The caller records the
    /// turn in `memory`.
    pub async fn run(&self, input: &str, memory: &ConversationBuffer) -> Result<String, AgentError> {
        let history = memory.buffer();
        let mut scratchpad = String::new();

        for iteration in 1..=self.max_iterations {
            let prompt = agent_prompt(&self.tools, &history, input, &scratchpad);
            let reply = self
                .chat
                .complete(&[ChatMessage::user(prompt)], AGENT_STOP)
                .await
                .map_err(AgentError::Model)?;

            match parse_agent_output(&reply)? {
                AgentStep::Finish { output, .. } => {
                    tracing::debug!(iteration, "agent finished");
                    return Ok(output);
                }
                AgentStep::Action { tool, input: tool_input, log } => {
                    tracing::debug!(iteration, tool = %tool, input = %tool_input, "agent action");
                    let observation = if tool == QA_TOOL_NAME {
                        self.qa
                            .run(&tool_input)
                            .await
                            .map_err(|error| AgentError::Tool {
                                tool: tool.clone(),
                                error,
                            })?
                            .answer
                    } else {
                        format!(
                            "{} is not a valid tool, try one of [{}].",
                            tool, QA_TOOL_NAME
                        )
                    };
                    extend_scratchpad(&mut scratchpad, &log, &observation);
                }
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "agent hit iteration limit");
        Ok(STOPPED_MESSAGE.to_string())
    }
}
