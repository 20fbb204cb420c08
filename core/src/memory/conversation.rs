use crate::llm::{ContentBlock, Message, Role};
use std::fmt;

/// Message history for one research session.
///
/// Roles alternate user → assistant → user. Tool results ride in user
/// messages and assistant turns keep their full block list so `tool_use`
/// ids can be matched on the next request.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    turns: usize,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user_text(text));
    }

    /// Store a model response; each one counts as a completed turn
    pub fn add_assistant_message(&mut self, blocks: Vec<ContentBlock>) {
        self.messages.push(Message::assistant_blocks(blocks));
        self.turns += 1;
    }

    pub fn add_tool_results(&mut self, results: Vec<ContentBlock>) {
        self.messages.push(Message::tool_results(results));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn turns(&self) -> usize {
        self.turns
    }

    /// True once the model has answered at least once in this session
    pub fn is_followup(&self) -> bool {
        self.turns > 0
    }

    /// Drop everything after the first `len` messages
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
        self.turns = self
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.turns = 0;
    }
}

impl fmt::Display for ConversationMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConversationMemory(messages={}, turns={})",
            self.messages.len(),
            self.turns
        )
    }
}
