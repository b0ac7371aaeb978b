//! Prompt templates and the agent output parser.
//!
//! The conversational agent follows the ReAct text protocol: the model is
//! shown a tool, a format description, the conversation so far, and its own
//! earlier reasoning (the scratchpad), and replies with either an
//! `Action:`/`Action Input:` pair or a `Final Answer:`.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const FINAL_ANSWER: &str = "Final Answer:";
pub const OBSERVATION: &str = "Observation:";
pub const THOUGHT: &str = "Thought:";

/// Generation stops here so the model cannot invent tool results.
pub const AGENT_STOP: &[&str] = &["\nObservation:", "\n\tObservation:"];

pub const AGENT_PREFIX: &str = "Have a conversation with a human, answering the following \
questions as best you can based on the context and memory available. You have access to a \
single tool:";

const FORMAT_INSTRUCTIONS: &str = "Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question";

/// Name and description of a tool as shown to the model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// Render the full agent prompt for one model call.
pub fn agent_prompt(
    tools: &[ToolSpec],
    chat_history: &str,
    input: &str,
    scratchpad: &str,
) -> String {
    let tool_lines = tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}\n\n{}\n\n{}\n\nBegin!\n\n{}\nQuestion: {}\n{}",
        AGENT_PREFIX,
        tool_lines,
        FORMAT_INSTRUCTIONS.replace("{tool_names}", &tool_names),
        chat_history,
        input,
        scratchpad
    )
}

/// Map step: ask for the parts of one chunk relevant to the question.
pub fn map_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following portion of a long document to see if any of the text is relevant \
to answer the question. Return any relevant text verbatim.\n\n{}\n\nQuestion: {}\n\
Relevant text, if any:",
        context, question
    )
}

/// Reduce step: combine extracted parts into the final answer.
pub fn reduce_prompt(summaries: &str, question: &str) -> String {
    format!(
        "Given the following extracted parts of a long document and a question, create a final \
answer. If you don't know the answer, just say that you don't know. Don't try to make up an \
answer.\n\nQUESTION: {}\n=========\n{}\n=========\nFINAL ANSWER:",
        question, summaries
    )
}

/// One decoded model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    /// Run `tool` with `input`. `log` is the raw reply, kept for the scratchpad.
    Action {
        tool: String,
        input: String,
        log: String,
    },
    /// The agent is done.
    Finish { output: String, log: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("model output contains both a final answer and an action: `{0}`")]
    AnswerAndAction(String),
    #[error("could not parse model output: `{0}`")]
    Unparseable(String),
}

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("valid action regex")
    })
}

/// Decode a model reply into an [`AgentStep`].
pub fn parse_agent_output(text: &str) -> Result<AgentStep, ParseError> {
    let action = action_re().captures(text);
    let answer_at = text.find(FINAL_ANSWER);

    match (action, answer_at) {
        (Some(_), Some(_)) => Err(ParseError::AnswerAndAction(text.to_string())),
        (None, Some(pos)) => Ok(AgentStep::Finish {
            output: text[pos + FINAL_ANSWER.len()..].trim().to_string(),
            log: text.to_string(),
        }),
        (Some(caps), None) => {
            let tool = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let input = caps
                .get(2)
                .map_or("", |m| m.as_str())
                .trim()
                .trim_matches('"')
                .to_string();
            Ok(AgentStep::Action {
                tool,
                input,
                log: text.to_string(),
            })
        }
        (None, None) => Err(ParseError::Unparseable(text.to_string())),
    }
}

/// Append one action/observation exchange to the scratchpad.
pub fn extend_scratchpad(scratchpad: &mut String, log: &str, observation: &str) {
    scratchpad.push_str(log);
    scratchpad.push('\n');
    scratchpad.push_str(OBSERVATION);
    scratchpad.push(' ');
    scratchpad.push_str(observation);
    scratchpad.push('\n');
    scratchpad.push_str(THOUGHT);
}
