use crate::llm::ToolDefinition;
use anyhow::Result;
use async_trait::async_trait;

/// A trait for tools that can be executed by the agent.
///
/// Tools are the agent's only way to gather information. An `Err` from
/// [`Tool::call`] is reported back to the model as a failed tool result; it
/// never aborts the research loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name the model uses to call the tool (e.g. "web_search")
    fn name(&self) -> &str;

    /// What the tool does and when the model should reach for it
    fn description(&self) -> &str;

    /// JSON schema for the tool input
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with the model-supplied input
    async fn call(&self, input: &serde_json::Value) -> Result<String>;

    /// Short human-readable description of a call, for progress output
    fn describe_call(&self, _input: &serde_json::Value) -> Option<String> {
        None
    }

    /// Definition handed to the Messages API
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters(),
        }
    }
}

/// Read a required string argument, accepting a bare JSON string as shorthand
pub fn string_arg<'a>(input: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .or_else(|| input.as_str())
        .map(str::trim)
}
