//! Configuration value types shared across sections

use serde::{Deserialize, Serialize};

/// Web search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// Serper.dev Google search (requires SERPER_API_KEY)
    #[default]
    Serper,

    /// DuckDuckGo HTML endpoint (free, no API key needed)
    #[serde(alias = "ddg")]
    DuckDuckGo,
}

impl SearchProvider {
    /// Whether this provider needs an API key to work
    pub fn requires_api_key(&self) -> bool {
        matches!(self, SearchProvider::Serper)
    }
}

impl std::str::FromStr for SearchProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serper" | "google" => Ok(SearchProvider::Serper),
            "duckduckgo" | "ddg" => Ok(SearchProvider::DuckDuckGo),
            _ => Err(format!("Unknown search provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchProvider::Serper => write!(f, "Serper (Google)"),
            SearchProvider::DuckDuckGo => write!(f, "DuckDuckGo"),
        }
    }
}
