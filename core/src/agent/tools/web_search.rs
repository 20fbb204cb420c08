//! Web search tool
//!
//! Supports two providers:
//! - Serper.dev (Google results, requires `SERPER_API_KEY`)
//! - DuckDuckGo HTML (free, no API key required)
//!
//! Both are rendered into the same numbered plain-text layout so the model
//! sees one format regardless of provider.

use super::WEB_SEARCH;
use crate::agent::tool::{string_arg, Tool};
use crate::config::{SearchProvider, WebSearchConfig};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

const SERPER_URL: &str = "https://google.serper.dev/search";
const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: usize = 10;

/// Circuit breaker state for preventing endless retries
#[derive(Debug)]
struct CircuitBreaker {
    failure_count: AtomicU32,
    last_failure: Mutex<Option<Instant>>,
    max_failures: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    fn new(max_failures: u32, cooldown: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            max_failures,
            cooldown,
        }
    }

    /// Open while the failure budget is spent and the cooldown hasn't elapsed
    fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::SeqCst) < self.max_failures {
            return false;
        }

        let mut last = self.last_failure.lock();
        match *last {
            Some(at) if at.elapsed() < self.cooldown => true,
            _ => {
                self.failure_count.store(0, Ordering::SeqCst);
                *last = None;
                false
            }
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        *self.last_failure.lock() = None;
    }

    fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_failure.lock() = Some(Instant::now());

        if count >= self.max_failures {
            crate::warn_log!(
                "[WEB_SEARCH] Circuit breaker OPENED after {} failures. Will retry after {:?}",
                count,
                self.cooldown
            );
        }
    }
}

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// 1-based position in the provider's result list
    pub rank: usize,
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Web search tool
#[derive(Debug)]
pub struct WebSearchTool {
    config: WebSearchConfig,
    client: reqwest::Client,
    circuit_breaker: CircuitBreaker,
}

impl WebSearchTool {
    pub fn new(config: WebSearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("sleuth/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build search HTTP client")?;

        Ok(Self {
            config,
            client,
            circuit_breaker: CircuitBreaker::new(3, Duration::from_secs(60)),
        })
    }

    /// Search and render results as the model-facing text block
    pub async fn search_and_format(&self, query: &str, num_results: usize) -> Result<String> {
        match self.config.provider {
            SearchProvider::Serper => {
                let data = self.search_serper(query, num_results).await?;
                Ok(format_serper_results(&data, num_results))
            }
            SearchProvider::DuckDuckGo => {
                let html = self.search_duckduckgo(query).await?;
                let hits = parse_duckduckgo_results(&html, num_results);
                crate::info_log!("[WEB_SEARCH:DuckDuckGo] Parsed {} results", hits.len());
                Ok(format_results(None, &hits))
            }
        }
    }

    fn serper_key(&self) -> Result<&str> {
        let api_key = self.config.api_key.trim();
        if api_key.is_empty() {
            bail!("SERPER_API_KEY is not set. Get a free key at https://serper.dev");
        }
        Ok(api_key)
    }

    fn endpoint<'a>(&'a self, default: &'a str) -> &'a str {
        self.config.endpoint.as_deref().unwrap_or(default)
    }

    /// Raw Serper API call
    async fn search_serper(&self, query: &str, num_results: usize) -> Result<serde_json::Value> {
        let api_key = self.serper_key()?;

        crate::debug_log!("[WEB_SEARCH:Serper] Sending request for query: '{}'", query);

        let response = self
            .client
            .post(self.endpoint(SERPER_URL))
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "num": num_results }))
            .send()
            .await
            .map_err(|e| anyhow!("Search request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let hint = match status.as_u16() {
                401 | 403 => " (check that SERPER_API_KEY is valid)",
                429 => " (Serper rate limit reached)",
                _ => "",
            };
            bail!("Search provider returned HTTP {}{}", status.as_u16(), hint);
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| anyhow!("Failed to parse search response: {}", e))
    }

    /// Fetch the DuckDuckGo HTML results page
    async fn search_duckduckgo(&self, query: &str) -> Result<String> {
        let url = format!(
            "{}?q={}",
            self.endpoint(DUCKDUCKGO_URL),
            urlencoding::encode(query)
        );
        crate::debug_log!("[WEB_SEARCH:DuckDuckGo] Sending request to: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Search request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Search provider returned HTTP {}", status.as_u16());
        }

        response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read search response: {}", e))
    }

    fn requested_results(&self, input: &serde_json::Value) -> usize {
        input
            .get("num_results")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(self.config.num_results)
            .clamp(1, MAX_RESULTS)
    }
}

/// Render a Serper response: optional direct answer, then numbered organic results
pub fn format_serper_results(data: &serde_json::Value, num_results: usize) -> String {
    let answer = data
        .get("answerBox")
        .and_then(|b| b.get("answer"))
        .and_then(|a| a.as_str())
        .filter(|a| !a.is_empty());

    let hits: Vec<SearchHit> = data
        .get("organic")
        .and_then(|o| o.as_array())
        .map(|organic| {
            organic
                .iter()
                .take(num_results)
                .enumerate()
                .map(|(i, res)| {
                    let field = |k: &str| res.get(k).and_then(|v| v.as_str()).unwrap_or("").to_string();
                    SearchHit {
                        rank: i + 1,
                        title: field("title"),
                        snippet: field("snippet"),
                        link: field("link"),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    format_results(answer, &hits)
}

/// Shared layout; hits without a title or link are skipped but keep their rank
pub fn format_results(answer: Option<&str>, hits: &[SearchHit]) -> String {
    let mut sections = Vec::new();

    if let Some(answer) = answer {
        sections.push(format!("DIRECT ANSWER: {}", answer));
    }

    for hit in hits {
        if hit.title.is_empty() || hit.link.is_empty() {
            continue;
        }
        sections.push(format!(
            "Result {}:\n  Title:   {}\n  Summary: {}\n  URL:     {}\n",
            hit.rank, hit.title, hit.snippet, hit.link
        ));
    }

    if sections.is_empty() {
        "No results found.".to_string()
    } else {
        sections.join("\n")
    }
}

/// Parse DuckDuckGo HTML result blocks
pub fn parse_duckduckgo_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    for block in result_block_boundary().split(html).skip(1) {
        if hits.len() >= limit {
            break;
        }

        let Some(anchor_start) = block.find("class=\"result__a\"") else {
            continue;
        };
        let anchor = &block[anchor_start..];
        let Some(link) = attr_value(anchor, "href") else {
            continue;
        };
        let Some(title) = element_text(anchor) else {
            continue;
        };

        let snippet = block
            .find("class=\"result__snippet\"")
            .and_then(|pos| element_text(&block[pos..]))
            .unwrap_or_default();

        if title.is_empty() {
            continue;
        }

        hits.push(SearchHit {
            rank: hits.len() + 1,
            title,
            snippet,
            link: resolve_duckduckgo_link(&link),
        });
    }

    hits
}

/// Start of a result container: `class="result"` or `class="result results_links ..."`
fn result_block_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r#"class="result[" ]"#).expect("valid regex"))
}

/// Value of `name="..."` starting from the current tag
fn attr_value(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')?;
    Some(html_escape::decode_html_entities(&tag[start..start + end]).to_string())
}

/// Text between the end of the current tag and the next `</a>`, tags stripped
fn element_text(fragment: &str) -> Option<String> {
    let open_end = fragment.find('>')? + 1;
    let close = fragment[open_end..].find("</a>")?;
    let inner = &fragment[open_end..open_end + close];
    let stripped = strip_tags(inner);
    Some(html_escape::decode_html_entities(stripped.trim()).to_string())
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&...`
fn resolve_duckduckgo_link(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let encoded = &href[pos + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    href.to_string()
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Search Google for current information. \
         Use this for any question that needs up-to-date facts. \
         Returns titles, summaries, and URLs of top results."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query. Be specific for better results."
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 5, max 10).",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    fn describe_call(&self, input: &serde_json::Value) -> Option<String> {
        string_arg(input, "query").map(str::to_string)
    }

    async fn call(&self, input: &serde_json::Value) -> Result<String> {
        let query = string_arg(input, "query").unwrap_or_default();
        if query.is_empty() {
            bail!("Search query cannot be empty");
        }

        // a missing key is a setup problem, not a provider failure
        if self.config.provider == SearchProvider::Serper {
            self.serper_key()?;
        }

        if self.circuit_breaker.is_open() {
            crate::warn_log!("[WEB_SEARCH] Circuit breaker is OPEN, skipping search");
            bail!("Web search is temporarily unavailable due to repeated failures. Try again later.");
        }

        let num_results = self.requested_results(input);
        crate::info_log!(
            "[WEB_SEARCH] provider={:?} query='{}' num_results={}",
            self.config.provider,
            query,
            num_results
        );

        let result = self.search_and_format(query, num_results).await;
        match &result {
            Ok(output) => {
                crate::info_log!("[WEB_SEARCH] Search successful - output length: {} bytes", output.len());
                self.circuit_breaker.record_success();
            }
            Err(e) => {
                crate::error_log!("[WEB_SEARCH] Search failed: {}", e);
                self.circuit_breaker.record_failure();
            }
        }
        result
    }
}
