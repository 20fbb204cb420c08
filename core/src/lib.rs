pub mod agent;
pub mod config;
pub mod error;
pub mod factory;
pub mod llm;
pub mod memory;
pub mod output;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use agent::{Agent, AgentEvent, AgentOptions};
pub use config::Config;
pub use error::{Result, SleuthError};
pub use factory::build_agent;
pub use memory::ConversationMemory;
