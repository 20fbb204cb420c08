//! Tool registry
//!
//! Tells the model which tools exist and routes its `tool_use` calls to the
//! right implementation. Failures are isolated: every call produces a result
//! the model can read, even when the tool is unknown or errors out.

use crate::agent::tool::Tool;
use crate::agent::tools::{WebScraperTool, WebSearchTool, WEB_SCRAPER, WEB_SEARCH};
use crate::config::Config;
use crate::error::SleuthError;
use crate::llm::ToolDefinition;
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of one dispatched tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text handed back to the model
    pub content: String,
    /// Marks the result as a failure for the model
    pub is_error: bool,
    /// How many times this tool has run in the current session, including this call
    pub call_number: usize,
}

pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    call_counts: Mutex<HashMap<String, usize>>,
}

impl ToolRegistry {
    /// Create a new, empty tool registry
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            call_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with `web_search` and `web_scraper` built from configuration
    pub fn with_defaults(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WebSearchTool::new(config.web_search.clone())?));
        registry.register(Arc::new(WebScraperTool::new(config.scraper.clone())?));
        Ok(registry)
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Registered tool names, in registration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tool definitions for the Messages API
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Progress text for a call, if the tool provides one
    pub fn describe_call(&self, name: &str, input: &serde_json::Value) -> Option<String> {
        self.lookup(name).and_then(|t| t.describe_call(input))
    }

    /// Execute a tool call with error isolation
    pub async fn execute(&self, name: &str, input: &serde_json::Value) -> ToolOutcome {
        let call_number = {
            let mut counts = self.call_counts.lock();
            let count = counts.entry(name.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        match self.dispatch(name, input).await {
            Ok(content) => {
                crate::debug_log!("Tool '{}' #{} returned {} bytes", name, call_number, content.len());
                ToolOutcome {
                    content,
                    is_error: false,
                    call_number,
                }
            }
            Err(e) => {
                crate::warn_log!("Tool '{}' #{} failed: {}", name, call_number, e);
                let message = match &e {
                    SleuthError::ToolNotFound { tool_name } => {
                        format!("Error: Unknown tool '{}'", tool_name)
                    }
                    SleuthError::ToolExecutionFailed { error, .. } => format!("Error: {}", error),
                    other => format!("Error: {}", other),
                };
                ToolOutcome {
                    content: message,
                    is_error: true,
                    call_number,
                }
            }
        }
    }

    async fn dispatch(&self, name: &str, input: &serde_json::Value) -> Result<String, SleuthError> {
        let tool = self.lookup(name).ok_or_else(|| SleuthError::ToolNotFound {
            tool_name: name.to_string(),
        })?;

        crate::info_log!("Running tool '{}' with input {}", name, input);
        tool.call(input)
            .await
            .map_err(|e| SleuthError::ToolExecutionFailed {
                tool_name: name.to_string(),
                error: format!("{:#}", e),
            })
    }

    fn lookup(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Number of calls to `name` since the last reset
    pub fn call_count(&self, name: &str) -> usize {
        self.call_counts.lock().get(name).copied().unwrap_or(0)
    }

    /// Reset counters for a new session
    pub fn reset(&self) {
        self.call_counts.lock().clear();
    }

    /// e.g. "2 search(es), 1 scrape(s)"; scrapes are omitted when there were none
    pub fn summary(&self) -> String {
        let searches = self.call_count(WEB_SEARCH);
        let scrapes = self.call_count(WEB_SCRAPER);
        let mut parts = vec![format!("{} search(es)", searches)];
        if scrapes > 0 {
            parts.push(format!("{} scrape(s)", scrapes));
        }
        parts.join(", ")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed {
        name: &'static str,
        reply: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed reply"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn call(&self, _input: &serde_json::Value) -> Result<String> {
            match self.reply {
                Ok(s) => Ok(s.to_string()),
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Fixed { name: WEB_SEARCH, reply: Ok("results") }));
        registry.register(Arc::new(Fixed { name: WEB_SCRAPER, reply: Err("Page not found (404).") }));
        registry
    }

    #[tokio::test]
    async fn test_execute_counts_calls() {
        let registry = registry();
        let first = registry.execute(WEB_SEARCH, &json!({})).await;
        let second = registry.execute(WEB_SEARCH, &json!({})).await;

        assert_eq!(first.content, "results");
        assert!(!first.is_error);
        assert_eq!(first.call_number, 1);
        assert_eq!(second.call_number, 2);
        assert_eq!(registry.summary(), "2 search(es)");
    }

    #[tokio::test]
    async fn test_tool_errors_become_error_results() {
        let registry = registry();
        let out = registry.execute(WEB_SCRAPER, &json!({"url": "https://x"})).await;
        assert!(out.is_error);
        assert_eq!(out.content, "Error: Page not found (404).");
        assert_eq!(registry.summary(), "0 search(es), 1 scrape(s)");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = registry();
        let out = registry.execute("calculator", &json!({})).await;
        assert!(out.is_error);
        assert_eq!(out.content, "Error: Unknown tool 'calculator'");
    }

    #[tokio::test]
    async fn test_reset_clears_counters() {
        let registry = registry();
        registry.execute(WEB_SEARCH, &json!({})).await;
        registry.reset();
        assert_eq!(registry.call_count(WEB_SEARCH), 0);
        assert_eq!(registry.summary(), "0 search(es)");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = registry();
        registry.register(Arc::new(Fixed { name: WEB_SEARCH, reply: Ok("other") }));
        assert_eq!(registry.tool_names(), vec![WEB_SEARCH, WEB_SCRAPER]);
        assert_eq!(registry.definitions().len(), 2);
        assert_eq!(registry.describe_call("shell", &json!({})), None);
    }

    #[test]
    fn test_defaults_register_both_tools_in_order() {
        let registry = ToolRegistry::with_defaults(&Config::default()).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs[0].name, WEB_SEARCH);
        assert_eq!(defs[1].name, WEB_SCRAPER);
        assert_eq!(defs[0].input_schema["required"][0], "query");
        assert_eq!(defs[1].input_schema["required"][0], "url");
    }
}
