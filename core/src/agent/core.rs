//! Agent Core Implementation
//!
//! A ReAct loop over the Messages API: the model reasons, asks for tools,
//! observes their results and repeats until it answers or the step cap is hit.

use crate::agent::event::AgentEvent;
use crate::agent::prompts::{FALLBACK_MESSAGE, FOLLOWUP_PROMPT, RESEARCHER_PROMPT};
use crate::agent::tool_registry::ToolRegistry;
use crate::error::Result;
use crate::llm::{ContentBlock, LanguageModel, MessageRequest, MessageResponse, StopReason};
use crate::memory::ConversationMemory;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Loop settings
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    pub max_tokens: u32,
    /// Safety cap against runaway tool loops
    pub max_iterations: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: "claude-opus-4-5-20251101".to_string(),
            max_tokens: 1024,
            max_iterations: 10,
        }
    }
}

/// The research agent for one conversation session.
pub struct Agent {
    model: Arc<dyn LanguageModel>,
    registry: ToolRegistry,
    memory: ConversationMemory,
    options: AgentOptions,
    event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("options", &self.options)
            .field("tools", &self.registry.tool_names())
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(model: Arc<dyn LanguageModel>, registry: ToolRegistry, options: AgentOptions) -> Self {
        Self {
            model,
            registry,
            memory: ConversationMemory::new(),
            options,
            event_tx: None,
        }
    }

    /// Report progress on `tx`
    pub fn with_event_sender(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Answer `question`, keeping the exchange in session memory.
    ///
    /// Returns the fallback message when the model stops early or the step
    /// cap is reached. A failed model call removes this question from the
    /// history before the error is returned.
    pub async fn run(&mut self, question: &str) -> Result<String> {
        let system = if self.memory.is_followup() {
            FOLLOWUP_PROMPT
        } else {
            RESEARCHER_PROMPT
        };
        let mark = self.memory.len();
        self.memory.add_user_message(question);

        crate::info_log!(
            "Question (followup={}, {}): {}",
            self.memory.is_followup(),
            self.memory,
            question
        );

        match self.react(system).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                crate::error_log!("Research loop failed: {}", e);
                self.memory.truncate(mark);
                Err(e)
            }
        }
    }

    async fn react(&mut self, system: &str) -> Result<String> {
        let max_steps = self.options.max_iterations;
        self.emit(AgentEvent::Thinking { max_steps });

        for step in 1..=max_steps {
            self.emit(AgentEvent::Step { n: step });

            let request = MessageRequest::new(
                self.options.model.clone(),
                self.options.max_tokens,
                self.memory.messages().to_vec(),
            )
            .with_system(system)
            .with_tools(self.registry.definitions());

            let response = self.model.create_message(&request).await?;
            crate::debug_log!(
                "Step {}: stop_reason={:?} {}",
                step,
                response.stop_reason,
                response.usage
            );

            match response.stop_reason.clone() {
                Some(StopReason::EndTurn) => {
                    let answer = response.text();
                    self.memory.add_assistant_message(response.replayable_content());
                    self.emit(AgentEvent::Finished {
                        steps: step,
                        summary: self.registry.summary(),
                    });
                    crate::info_log!("Finished in {} step(s): {}", step, self.registry.summary());

                    return Ok(if answer.is_empty() {
                        FALLBACK_MESSAGE.to_string()
                    } else {
                        answer
                    });
                }
                Some(StopReason::ToolUse) => {
                    self.memory.add_assistant_message(response.replayable_content());
                    let results = self.execute_tools(&response).await;
                    self.memory.add_tool_results(results);
                }
                other => {
                    let reason = other.map_or_else(|| "none".to_string(), |r| r.to_string());
                    crate::warn_log!("Unexpected stop_reason: {}", reason);
                    self.emit(AgentEvent::UnexpectedStop { reason });
                    break;
                }
            }
        }

        Ok(FALLBACK_MESSAGE.to_string())
    }

    /// Run every requested tool in order; one `tool_result` per call
    async fn execute_tools(&self, response: &MessageResponse) -> Vec<ContentBlock> {
        let mut results = Vec::new();

        for call in response.tool_uses() {
            self.emit(AgentEvent::ToolCall {
                name: call.name.to_string(),
                detail: self.registry.describe_call(call.name, call.input),
            });

            let outcome = self.registry.execute(call.name, call.input).await;
            results.push(ContentBlock::tool_result(call.id, outcome.content, outcome.is_error));
        }

        results
    }

    /// Wipe memory and tool counters for a fresh conversation
    pub fn new_session(&mut self) {
        self.memory.clear();
        self.registry.reset();
        crate::info_log!("New session started");
        self.emit(AgentEvent::SessionReset);
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
