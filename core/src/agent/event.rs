use serde::Serialize;

/// Progress events the research loop emits while it works.
/// The binary renders them; tests collect them from the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A question was accepted and the loop is starting
    Thinking { max_steps: usize },
    /// Step `n` of the loop is about to call the model
    Step { n: usize },
    /// A tool is being executed
    ToolCall { name: String, detail: Option<String> },
    /// The model produced its final answer
    Finished { steps: usize, summary: String },
    /// The model stopped for a reason the loop cannot continue from
    UnexpectedStop { reason: String },
    /// Memory and counters were wiped
    SessionReset,
}
