//! LLM client module
//!
//! Talks to the Anthropic Messages API with tool use. The agent only sees the
//! [`LanguageModel`] trait, so tests can drive it with a scripted model.

pub mod chat;
pub mod client;

pub use chat::{
    ContentBlock, Message, MessageContent, MessageRequest, MessageResponse, Role, StopReason,
    ToolDefinition, ToolUse, Usage,
};
pub use client::LlmClient;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Version header the Messages API requires
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// LLM Configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API base URL, without the `/v1/messages` path
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key sent as `x-api-key`
    pub api_key: String,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for 429/5xx/network failures
    pub max_retries: u32,
    /// First backoff delay, doubled on each retry
    pub retry_base_delay: Duration,
}

impl LlmConfig {
    /// Create a new LLM config
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        LlmConfig {
            base_url,
            model,
            api_key,
            max_tokens: 1024,
            timeout: Duration::from_secs(300),
            max_retries: 5,
            retry_base_delay: Duration::from_secs(3),
        }
    }

    /// Set maximum tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Anything that can answer a Messages API request
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse>;
}
