//! Configuration management
//!
//! Settings come from three layers, later ones winning:
//! 1. `sleuth.yaml` (current directory, then the user config directory)
//! 2. environment variables, including a `.env` file in the working directory
//! 3. command-line overrides applied by the binary

pub mod bridge;
pub mod types;

pub use bridge::{config_to_agent_options, config_to_llm_config};
pub use types::SearchProvider;

use crate::error::SleuthError;
use crate::util::mask_secret;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "sleuth.yaml";

/// Default config directory name
const CONFIG_DIR_NAME: &str = "sleuth";

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const SERPER_API_KEY: &str = "SERPER_API_KEY";
pub const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const SLEUTH_MODEL: &str = "SLEUTH_MODEL";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Language model endpoint
    #[serde(default)]
    pub llm: LlmSettings,

    /// Web search tool
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Web scraper tool
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Agent loop
    #[serde(default)]
    pub agent: AgentConfig,

    /// Mirror debug log lines to stderr
    #[serde(default)]
    pub verbose: bool,
}

/// Anthropic Messages API settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Usually supplied through ANTHROPIC_API_KEY instead
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_llm_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-opus-4-5-20251101".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    5
}

/// Web search configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebSearchConfig {
    #[serde(default)]
    pub provider: SearchProvider,

    /// Usually supplied through SERPER_API_KEY instead
    #[serde(default)]
    pub api_key: String,

    /// Results returned when the model doesn't ask for a specific number
    #[serde(default = "default_num_results")]
    pub num_results: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u64,

    /// Overrides the provider's search URL (self-hosted proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::default(),
            api_key: String::new(),
            num_results: default_num_results(),
            timeout_seconds: default_search_timeout(),
            endpoint: None,
        }
    }
}

fn default_num_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    30
}

/// Web scraper configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Max characters of page text handed back to the model
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_scrape_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            timeout_seconds: default_scrape_timeout(),
        }
    }
}

fn default_max_chars() -> usize {
    3000
}

fn default_scrape_timeout() -> u64 {
    10
}

/// Agent configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Maximum reason/act steps per question
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

/// Load `.env` from the working directory (or a parent) into the process environment.
/// Variables already set take precedence.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Find the configuration file in standard locations
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(dir) = get_config_dir() {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Get the configuration directory path
pub fn get_config_dir() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Some(dir.join(CONFIG_DIR_NAME));
    }

    dirs::home_dir().map(|home| home.join(".config").join(CONFIG_DIR_NAME))
}

/// Directory for logs and other runtime data
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

impl Config {
    /// Load configuration from `path`, or the standard locations, then apply the environment.
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match find_config_file() {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Overlay environment values. `lookup` is injected so tests don't touch the process env.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ANTHROPIC_API_KEY) {
            self.llm.api_key = key;
        }
        if let Some(key) = non_empty(SERPER_API_KEY) {
            self.web_search.api_key = key;
        }
        if let Some(url) = non_empty(ANTHROPIC_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty(SLEUTH_MODEL) {
            self.llm.model = model;
        }
    }

    /// Names of the credentials the current setup still needs
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.llm.api_key.trim().is_empty() {
            missing.push(ANTHROPIC_API_KEY);
        }
        if self.web_search.provider.requires_api_key() && self.web_search.api_key.trim().is_empty()
        {
            missing.push(SERPER_API_KEY);
        }
        missing
    }

    /// Fail with the first missing credential, if any
    pub fn require_keys(&self) -> std::result::Result<(), SleuthError> {
        match self.missing_keys().first() {
            Some(key) => Err(SleuthError::MissingConfig {
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Sanity-check numeric settings
    pub fn validate(&self) -> std::result::Result<(), SleuthError> {
        if self.agent.max_iterations == 0 {
            return Err(SleuthError::InvalidConfig {
                message: "agent.max_iterations must be at least 1".to_string(),
            });
        }
        if self.llm.max_tokens == 0 {
            return Err(SleuthError::InvalidConfig {
                message: "llm.max_tokens must be at least 1".to_string(),
            });
        }
        if self.scraper.max_chars == 0 {
            return Err(SleuthError::InvalidConfig {
                message: "scraper.max_chars must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// YAML rendering with API keys masked, for `sleuth config`
    pub fn to_redacted_yaml(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.llm.api_key = mask_secret(&self.llm.api_key);
        shown.web_search.api_key = mask_secret(&self.web_search.api_key);
        serde_yml::to_string(&shown).context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_reference_behaviour() {
        let config = Config::default();
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.scraper.max_chars, 3000);
        assert_eq!(config.scraper.timeout_seconds, 10);
        assert_eq!(config.web_search.num_results, 5);
        assert_eq!(config.web_search.provider, SearchProvider::Serper);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sleuth.yaml");
        fs::write(
            &path,
            "agent:\n  max_iterations: 4\nweb_search:\n  provider: duckduckgo\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.web_search.provider, SearchProvider::DuckDuckGo);
        assert_eq!(config.llm.model, "claude-opus-4-5-20251101");
        assert_eq!(config.scraper.max_chars, 3000);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sleuth.yaml");
        fs::write(&path, "agent: [not, a, map").unwrap();
        let err = Config::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ANTHROPIC_API_KEY, "sk-ant-env"),
            (SERPER_API_KEY, ""),
            (SLEUTH_MODEL, "claude-haiku"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.web_search.api_key = "from-file".to_string();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key, "sk-ant-env");
        assert_eq!(config.llm.model, "claude-haiku");
        // blank env values don't clobber the file
        assert_eq!(config.web_search.api_key, "from-file");
    }

    #[test]
    fn test_missing_keys_depend_on_provider() {
        let mut config = Config::default();
        assert_eq!(config.missing_keys(), vec![ANTHROPIC_API_KEY, SERPER_API_KEY]);

        config.web_search.provider = SearchProvider::DuckDuckGo;
        assert_eq!(config.missing_keys(), vec![ANTHROPIC_API_KEY]);

        config.llm.api_key = "sk-ant-x".to_string();
        assert!(config.missing_keys().is_empty());
        assert!(config.require_keys().is_ok());
    }

    #[test]
    fn test_require_keys_reports_first_missing() {
        let config = Config::default();
        match config.require_keys() {
            Err(SleuthError::MissingConfig { key }) => assert_eq!(key, ANTHROPIC_API_KEY),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let mut config = Config::default();
        config.agent.max_iterations = 0;
        assert!(matches!(
            config.validate(),
            Err(SleuthError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_load_from_file_reads_search_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sleuth.yaml");
        fs::write(
            &path,
            "agent:\n  max_iterations: 7\nweb_search:\n  endpoint: http://127.0.0.1:9000/search\n",
        )
        .unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.agent.max_iterations, 7);
        assert_eq!(
            loaded.web_search.endpoint.as_deref(),
            Some("http://127.0.0.1:9000/search")
        );
        assert_eq!(Config::default().web_search.endpoint, None);
    }

    #[test]
    fn test_redacted_yaml_hides_keys() {
        let mut config = Config::default();
        config.llm.api_key = "sk-ant-api03-secretsecret".to_string();
        let yaml = config.to_redacted_yaml().unwrap();
        assert!(!yaml.contains("secretsecret"));
        assert!(yaml.contains("sk-ant..."));
        assert!(yaml.contains("(not set)"));
    }
}
