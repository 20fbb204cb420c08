//! Wires configuration into a ready-to-run [`Agent`]

use crate::agent::{Agent, ToolRegistry};
use crate::config::{config_to_agent_options, config_to_llm_config, Config};
use crate::llm::LlmClient;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Build the agent with the Anthropic client and the default web tools
pub fn build_agent(config: &Config) -> Result<Agent> {
    config.validate()?;
    config.require_keys()?;

    let client = LlmClient::new(config_to_llm_config(config))
        .context("Failed to create LLM client")?;
    let registry = ToolRegistry::with_defaults(config).context("Failed to create tools")?;

    crate::info_log!(
        "Agent ready: model={} provider={} tools={:?}",
        client.model(),
        config.web_search.provider,
        registry.tool_names()
    );

    Ok(Agent::new(
        Arc::new(client),
        registry,
        config_to_agent_options(config),
    ))
}
