//! Shared utility functions for the application

use anyhow::{bail, Context, Result};

/// Sanitize a string value for safe use in HTTP headers
///
/// Header values cannot contain control characters, DEL, or line breaks.
pub fn sanitize_for_header(value: &str, field_name: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    for (index, ch) in value.char_indices() {
        if ch.is_control() {
            bail!(
                "{} contains invalid character at position {} ({:?}). \
                Control characters, newlines, carriage returns, and null bytes are not allowed.",
                field_name,
                index,
                ch
            );
        }
    }

    Ok(value.to_string())
}

/// Validate an API key can be sent as a raw header value (`x-api-key`, `X-API-KEY`)
pub fn validate_api_key(api_key: &str, field_name: &str) -> Result<String> {
    let trimmed = api_key.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        bail!("{} is empty or set to 'none'", field_name);
    }

    sanitize_for_header(trimmed, field_name)?;

    trimmed
        .parse::<reqwest::header::HeaderValue>()
        .with_context(|| {
            format!(
                "{} is not a valid HTTP header value ({} characters)",
                field_name,
                trimmed.len()
            )
        })?;

    Ok(trimmed.to_string())
}

/// Sanitize a base URL for API requests
///
/// Rejects double-encoded URLs and anything that isn't http(s).
/// Trailing slashes are removed so paths can be appended directly.
pub fn sanitize_base_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    if trimmed.contains("%2F") || trimmed.contains("%3D") || trimmed.contains("%20") {
        bail!(
            "{} appears to contain URL-encoded characters (e.g., %2F, %3D, %20). \
            Please verify the URL is not double-encoded.",
            field_name
        );
    }

    if !is_http_url(trimmed) {
        bail!(
            "{} must start with 'http://' or 'https://'. Got: {}",
            field_name,
            trimmed
        );
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// True when the string is an absolute http(s) URL
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Truncate to at most `max_chars` characters, never splitting a UTF-8 sequence.
/// Returns the truncated slice and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Mask a secret for display, keeping only a short prefix
pub fn mask_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "(not set)".to_string();
    }
    let prefix: String = trimmed.chars().take(6).collect();
    if trimmed.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{}...", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_header_valid() {
        assert!(sanitize_for_header("abc123", "test").is_ok());
        assert!(sanitize_for_header("sk-ant-abc123xyz", "test").is_ok());
        assert!(sanitize_for_header("hello world", "test").is_ok());
    }

    #[test]
    fn test_sanitize_for_header_invalid() {
        assert!(sanitize_for_header("abc\n123", "test").is_err());
        assert!(sanitize_for_header("abc\r123", "test").is_err());
        assert!(sanitize_for_header("abc\x00123", "test").is_err());
        assert!(sanitize_for_header("abc\x1f123", "test").is_err());
        assert!(sanitize_for_header("abc\x7f123", "test").is_err());
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key("  sk-test123 ", "key").unwrap(), "sk-test123");
        assert!(validate_api_key("", "key").is_err());
        assert!(validate_api_key("none", "key").is_err());
        assert!(validate_api_key("NONE", "key").is_err());
        assert!(validate_api_key(" \n ", "key").is_err());
    }

    #[test]
    fn test_sanitize_base_url() {
        assert_eq!(
            sanitize_base_url("https://api.anthropic.com/", "url").unwrap(),
            "https://api.anthropic.com"
        );
        assert!(sanitize_base_url("http://localhost:8080", "url").is_ok());
        assert!(sanitize_base_url("", "url").is_err());
        assert!(sanitize_base_url("invalid-url", "url").is_err());
        assert!(sanitize_base_url("https://api.example%2Fcom", "url").is_err());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), ("hello", false));
        assert_eq!(truncate_chars("hello", 5), ("hello", false));
        assert_eq!(truncate_chars("hello", 3), ("hel", true));
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-ant-api03-abcdef"), "sk-ant...");
    }
}
