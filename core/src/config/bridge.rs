//! Config Bridge
//!
//! Converts the file/env `Config` into the structs the runtime components take:
//! - `Config.llm` → `LlmConfig` (for `LlmClient`)
//! - `Config.llm` + `Config.agent` → `AgentOptions` (for `Agent`)

use crate::agent::AgentOptions;
use crate::config::Config;
use crate::llm::LlmConfig;
use std::time::Duration;

/// Convert Config to LlmConfig
pub fn config_to_llm_config(config: &Config) -> LlmConfig {
    LlmConfig::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.api_key.clone(),
    )
    .with_max_tokens(config.llm.max_tokens)
    .with_timeout(Duration::from_secs(config.llm.timeout_seconds))
    .with_max_retries(config.llm.max_retries)
}

/// Convert Config to the agent loop options
pub fn config_to_agent_options(config: &Config) -> AgentOptions {
    AgentOptions {
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        max_iterations: config.agent.max_iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_carries_settings() {
        let mut config = Config::default();
        config.llm.api_key = "sk-ant-test".to_string();
        config.llm.timeout_seconds = 42;
        config.llm.max_retries = 2;

        let llm = config_to_llm_config(&config);
        assert_eq!(llm.base_url, "https://api.anthropic.com");
        assert_eq!(llm.api_key, "sk-ant-test");
        assert_eq!(llm.max_tokens, 1024);
        assert_eq!(llm.timeout, Duration::from_secs(42));
        assert_eq!(llm.max_retries, 2);
    }

    #[test]
    fn test_agent_options_follow_model_override() {
        let mut config = Config::default();
        config.llm.model = "claude-sonnet".to_string();
        config.agent.max_iterations = 3;

        let options = config_to_agent_options(&config);
        assert_eq!(options.model, "claude-sonnet");
        assert_eq!(options.max_iterations, 3);
        assert_eq!(options.max_tokens, 1024);
    }
}
