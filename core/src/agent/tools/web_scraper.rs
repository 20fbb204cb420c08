//! Web scraper tool
//!
//! Fetches a page and reduces it to readable text: noise elements are
//! dropped, the main content region is located, and the result is cleaned
//! and truncated so a single page cannot flood the model's context.

use super::WEB_SCRAPER;
use crate::agent::tool::{string_arg, Tool};
use crate::config::ScraperConfig;
use crate::util::{is_http_url, truncate_chars};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

/// Tags that never contain useful article content
const NOISE_TAGS: &[&str] = &[
    "script",
    "style",
    "nav",
    "footer",
    "header",
    "aside",
    "form",
    "iframe",
    "noscript",
    "advertisement",
];

/// Elements that have no closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Pages are cut to this many bytes before extraction
const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Title and body text pulled out of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: Option<String>,
    pub text: String,
}

pub struct WebScraperTool {
    client: reqwest::Client,
    max_chars: usize,
    timeout: Duration,
}

impl WebScraperTool {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build scraper HTTP client")?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
            timeout,
        })
    }

    /// Fetch `url` and return its readable text with a SOURCE/TITLE header
    pub async fn scrape(&self, url: &str) -> Result<String> {
        if !is_http_url(url) {
            bail!("Invalid URL '{}'. Must start with http:// or https://", url);
        }

        crate::info_log!("[WEB_SCRAPER] Scraping: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!(
                    "Page took too long to load (>{}s). Try a different URL.",
                    self.timeout.as_secs()
                )
            } else if e.is_connect() {
                anyhow!(
                    "Could not connect to '{}'. Check the URL or your internet connection.",
                    url
                )
            } else {
                anyhow!("Failed to fetch '{}': {}", url, e)
            }
        })?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::FORBIDDEN => {
                bail!("Access denied (403). '{}' blocks automated requests.", url)
            }
            StatusCode::NOT_FOUND => bail!("Page not found (404). '{}' does not exist.", url),
            s => bail!("HTTP {} from '{}'.", s.as_u16(), url),
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("text/html") {
            bail!(
                "Cannot scrape this file type (Content-Type: {}). web_scraper only works on HTML pages.",
                content_type
            );
        }

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!(
                    "Page took too long to load (>{}s). Try a different URL.",
                    self.timeout.as_secs()
                )
            } else {
                anyhow!("Failed to read '{}': {}", url, e)
            }
        })?;

        let extracted = tokio::task::spawn_blocking(move || extract_readable(&html))
            .await
            .context("Page extraction task failed")?;
        if extracted.text.is_empty() {
            bail!("Page was found but contained no readable text.");
        }

        crate::debug_log!(
            "[WEB_SCRAPER] Extracted {} chars from {}",
            extracted.text.chars().count(),
            url
        );
        Ok(render_page(url, &extracted, self.max_chars))
    }
}

/// Header plus (possibly truncated) body text
pub fn render_page(url: &str, page: &Extracted, max_chars: usize) -> String {
    let title = page.title.as_deref().unwrap_or("Unknown");
    let mut out = format!("SOURCE: {}\nTITLE:  {}\n{}\n", url, title, "─".repeat(40));

    let (body, truncated) = truncate_chars(&page.text, max_chars);
    out.push_str(body);
    if truncated {
        out.push_str(&format!("\n\n[... truncated at {} chars ...]", max_chars));
    }
    out
}

/// Reduce an HTML document to its title and cleaned main-content text
pub fn extract_readable(html: &str) -> Extracted {
    let html = cap_page(html);
    let title = extract_title(html);

    let mut doc = comment_re().replace_all(html, "").into_owned();
    for tag in NOISE_TAGS {
        doc = remove_elements(&doc, tag);
    }
    doc = remove_hidden(&doc);

    let region = main_region(&doc).unwrap_or(&doc);
    let text = clean_text(&html_to_text(region));

    Extracted { title, text }
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("valid regex"))
}

fn hidden_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)<([a-z][a-z0-9]*)\b[^>]*\bstyle\s*=\s*(?:"[^"]*(?:display\s*:\s*none|visibility\s*:\s*hidden)[^"]*"|'[^']*(?:display\s*:\s*none|visibility\s*:\s*hidden)[^']*')[^>]*>"#,
        )
        .expect("valid regex")
    })
}

/// Candidate main-content openers, in priority order
fn region_openers() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)<(article)\b[^>]*>",
            r"(?i)<(main)\b[^>]*>",
            r#"(?i)<([a-z][a-z0-9]*)\b[^>]*\bid\s*=\s*["']content["'][^>]*>"#,
            r#"(?i)<([a-z][a-z0-9]*)\b[^>]*\bclass\s*=\s*["'][^"']*(?:article|content|post|story)[^"']*["'][^>]*>"#,
            r"(?i)<(body)\b[^>]*>",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

fn extract_title(html: &str) -> Option<String> {
    let raw = title_re().captures(html)?.get(1)?.as_str();
    let title = html_escape::decode_html_entities(raw).trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Longest prefix of `html` within `MAX_PAGE_BYTES`, cut on a char boundary
fn cap_page(html: &str) -> &str {
    if html.len() <= MAX_PAGE_BYTES {
        return html;
    }
    let mut end = MAX_PAGE_BYTES;
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    &html[..end]
}

/// Inner HTML of the first matching main-content element
fn main_region(doc: &str) -> Option<&str> {
    let lower = doc.to_ascii_lowercase();
    region_openers().iter().find_map(|re| {
        let caps = re.captures(doc)?;
        let open = caps.get(0)?;
        let tag = caps.get(1)?.as_str();
        let close = find_matching_close(&lower, tag, open.end()).unwrap_or(doc.len());
        Some(&doc[open.end()..close])
    })
}

/// Byte offset of the `</tag>` that closes an element whose opening tag ends at `from`.
/// `lower` is the ASCII-lowercased document. Nested elements with the same name
/// are counted unless they close themselves.
fn find_matching_close(lower: &str, tag: &str, from: usize) -> Option<usize> {
    let tag = tag.to_ascii_lowercase();
    let open_pat = format!("<{}", tag);
    let close_pat = format!("</{}", tag);

    let mut depth = 1usize;
    let mut pos = from;
    let mut next_close = find_tag_start(lower, &close_pat, pos)?;
    loop {
        match find_tag_start(&lower[..next_close], &open_pat, pos) {
            Some(o) => {
                let self_closed = tag_end(lower, o).is_some_and(|end| is_self_closed(&lower[o..end]));
                if !self_closed {
                    depth += 1;
                }
                pos = o + open_pat.len();
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                pos = next_close + close_pat.len();
                next_close = find_tag_start(lower, &close_pat, pos)?;
            }
        }
    }
}

/// Find `pat` (e.g. `<div`) where it is followed by a tag-name boundary
fn find_tag_start(haystack: &str, pat: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = haystack.get(search..)?.find(pat) {
        let at = search + rel;
        let after = haystack.as_bytes().get(at + pat.len()).copied();
        match after {
            Some(b) if b.is_ascii_alphanumeric() || b == b'-' => search = at + pat.len(),
            _ => return Some(at),
        }
    }
    None
}

/// Offset just past the `>` of the tag starting at `at`
fn tag_end(doc: &str, at: usize) -> Option<usize> {
    doc.get(at..)?.find('>').map(|i| at + i + 1)
}

/// `<iframe src="..." />`
fn is_self_closed(open_tag: &str) -> bool {
    open_tag.trim_end_matches('>').trim_end().ends_with('/')
}

/// Remove every `<tag ...>...</tag>` element, nested ones included
fn remove_elements(doc: &str, tag: &str) -> String {
    let lower = doc.to_ascii_lowercase();
    let open_pat = format!("<{}", tag);
    let mut out = String::with_capacity(doc.len());
    let mut pos = 0;

    while let Some(start) = find_tag_start(&lower, &open_pat, pos) {
        out.push_str(&doc[pos..start]);
        let Some(open_end) = tag_end(&lower, start) else {
            pos = doc.len();
            break;
        };
        pos = if is_self_closed(&lower[start..open_end]) {
            open_end
        } else {
            match find_matching_close(&lower, tag, open_end) {
                Some(close) => tag_end(&lower, close).unwrap_or(doc.len()),
                // unclosed element swallows the rest of the document
                None => doc.len(),
            }
        };
    }
    out.push_str(&doc[pos.min(doc.len())..]);
    out
}

/// Remove elements hidden through an inline style, in one pass
fn remove_hidden(doc: &str) -> String {
    let lower = doc.to_ascii_lowercase();
    let mut out = String::with_capacity(doc.len());
    let mut pos = 0;

    for caps in hidden_open_re().captures_iter(doc) {
        let (Some(open), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // already dropped with an enclosing hidden element
        if open.start() < pos {
            continue;
        }
        let tag = tag.as_str().to_ascii_lowercase();
        let self_closing = is_self_closed(open.as_str()) || VOID_TAGS.contains(&tag.as_str());

        let end = if self_closing {
            open.end()
        } else {
            match find_matching_close(&lower, &tag, open.end()) {
                Some(close) => tag_end(&lower, close).unwrap_or(doc.len()),
                None => open.end(),
            }
        };

        out.push_str(&doc[pos..open.start()]);
        pos = end;
    }

    out.push_str(&doc[pos..]);
    out
}

/// Every tag becomes a line break, then entities are decoded
fn html_to_text(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, "\n");
    html_escape::decode_html_entities(&text).into_owned()
}

/// Trim lines, drop blank ones, collapse runs of spaces
fn clean_text(text: &str) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    spaces_re().replace_all(&joined, " ").trim().to_string()
}

#[async_trait]
impl Tool for WebScraperTool {
    fn name(&self) -> &str {
        WEB_SCRAPER
    }

    fn description(&self) -> &str {
        "Fetch and read the full text of a specific URL. \
         Use this when search snippets aren't detailed enough \
         and you need the complete article content."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Full URL to fetch (must start with https://)."
                }
            },
            "required": ["url"]
        })
    }

    fn describe_call(&self, input: &serde_json::Value) -> Option<String> {
        string_arg(input, "url").map(str::to_string)
    }

    async fn call(&self, input: &serde_json::Value) -> Result<String> {
        let url = string_arg(input, "url").unwrap_or_default();
        self.scrape(url).await
    }
}
