//! Research agent
//!
//! ```text
//! question ──▶ Agent::run ──▶ LanguageModel ──▶ stop_reason
//!                  ▲                               │
//!                  │          tool_use             ▼
//!                  └──── ToolRegistry::execute ◀───┘
//! ```
//!
//! - `core`: the ReAct loop and session handling
//! - `tool` / `tool_registry`: the tool trait and dispatch
//! - `tools`: `web_search` and `web_scraper`
//! - `event`: progress events for the front-end
//! - `prompts`: system prompts and the fallback reply

pub mod core;
pub mod event;
pub mod logger;
pub mod prompts;
pub mod tool;
pub mod tool_registry;
pub mod tools;

pub use self::core::{Agent, AgentOptions};
pub use event::AgentEvent;
pub use tool::Tool;
pub use tool_registry::{ToolOutcome, ToolRegistry};
