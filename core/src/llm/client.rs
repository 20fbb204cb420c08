//! Anthropic Messages API client
//!
//! Wraps reqwest with jittered exponential backoff for 429, 5xx and transport
//! failures, honouring `Retry-After` when the provider sends one.

use super::chat::{MessageRequest, MessageResponse};
use super::{LanguageModel, LlmConfig, ANTHROPIC_VERSION};
use crate::error::{Result, SleuthError};
use crate::util::{sanitize_base_url, validate_api_key};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client as HttpClient, StatusCode,
};
use std::time::Instant;
use tokio::time::{sleep, Duration};

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Main LLM Client
pub struct LlmClient {
    config: LlmConfig,
    http_client: HttpClient,
    messages_url: String,
    headers: HeaderMap,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Result<Self> {
        let base_url = sanitize_base_url(&config.base_url, "Base URL").map_err(|e| {
            SleuthError::InvalidConfig {
                message: e.to_string(),
            }
        })?;
        let api_key = validate_api_key(&config.api_key, "ANTHROPIC_API_KEY")
            .map_err(|_| SleuthError::MissingConfig {
                key: "ANTHROPIC_API_KEY".to_string(),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        let key_value = HeaderValue::from_str(&api_key).map_err(|e| SleuthError::InvalidConfig {
            message: format!("ANTHROPIC_API_KEY is not a valid header value: {}", e),
        })?;
        headers.insert("x-api-key", key_value);

        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sleuth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SleuthError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(LlmClient {
            messages_url: format!("{}/v1/messages", base_url),
            config,
            http_client,
            headers,
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one Messages API request, retrying transient failures
    pub async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        crate::info_log!(
            "Messages request: model={}, messages={}, tools={}",
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let started = Instant::now();
        let response = self.send_with_backoff(request).await?;
        let status = response.status();

        let result = match status {
            StatusCode::OK => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| SleuthError::from_transport(&e, self.config.timeout))?;
                serde_json::from_str::<MessageResponse>(&text).map_err(|e| {
                    crate::error_log!("Failed to parse Messages response: {}. Raw body: {}", e, text);
                    SleuthError::InvalidResponse {
                        message: e.to_string(),
                    }
                })
            }
            StatusCode::UNAUTHORIZED => Err(SleuthError::Unauthorized {
                message: error_message(response).await,
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(SleuthError::RateLimitExceeded {
                retry_after: retry_after(response.headers()),
            }),
            status => Err(SleuthError::ProviderError {
                status: status.as_u16(),
                message: error_message(response).await,
            }),
        };

        match &result {
            Ok(resp) => crate::info_log!(
                "Messages completed in {:?}: stop_reason={:?} input={} output={}",
                started.elapsed(),
                resp.stop_reason,
                resp.usage.input_tokens,
                resp.usage.output_tokens
            ),
            Err(e) => crate::error_log!("Messages failed after {:?}: {}", started.elapsed(), e),
        }

        result
    }

    /// Jittered backoff retry, respecting Retry-After headers.
    /// Returns the last response once retries are exhausted so the caller can map its status.
    async fn send_with_backoff(&self, request: &MessageRequest) -> Result<reqwest::Response> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;
        let mut delay = self.config.retry_base_delay;

        loop {
            let sent = self
                .http_client
                .post(&self.messages_url)
                .headers(self.headers.clone())
                .json(request)
                .send()
                .await;

            let wait = match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || attempt >= max_retries {
                        return Ok(response);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = retry_after(response.headers()).unwrap_or(delay);
                        crate::warn_log!(
                            "Rate limited (429), waiting {:?} before retry (attempt {}/{})",
                            wait,
                            attempt + 1,
                            max_retries
                        );
                        wait
                    } else if SleuthError::is_retryable_status(status.as_u16()) {
                        crate::warn_log!(
                            "Provider error {}, retrying in {:?} (attempt {}/{})",
                            status,
                            delay,
                            attempt + 1,
                            max_retries
                        );
                        delay
                    } else {
                        return Ok(response);
                    }
                }
                Err(e) => {
                    let err = SleuthError::from_transport(&e, self.config.timeout);
                    if attempt >= max_retries || !err.is_retryable() {
                        return Err(err);
                    }
                    crate::warn_log!("Network error ({}), retrying in {:?}", e, delay);
                    delay
                }
            };

            sleep(wait).await;
            attempt += 1;
            delay = next_delay(delay);
        }
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        LlmClient::create_message(self, request).await
    }
}

/// Double the delay, add +/- 500ms of jitter, cap at one minute
fn next_delay(delay: Duration) -> Duration {
    let jitter_ms: i64 = rand::thread_rng().gen_range(-500..=500);
    let doubled = delay.as_millis().saturating_mul(2) as i64;
    let ms = (doubled + jitter_ms).max(0) as u64;
    Duration::from_millis(ms).min(MAX_BACKOFF)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull `error.message` out of an Anthropic error body
async fn error_message(response: reqwest::Response) -> String {
    let body: Option<serde_json::Value> = response.json().await.ok();
    extract_error_message(body.as_ref())
}

fn extract_error_message(body: Option<&serde_json::Value>) -> String {
    body.and_then(|v| v.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, StopReason};
    use crate::testing::{http_response, json_response, StubServer};
    use serde_json::json;

    fn config(api_key: &str) -> LlmConfig {
        LlmConfig::new(
            "https://api.anthropic.com/".to_string(),
            "claude-test".to_string(),
            api_key.to_string(),
        )
    }

    #[test]
    fn test_new_builds_messages_url() {
        let client = LlmClient::new(config("sk-ant-test")).unwrap();
        assert_eq!(client.messages_url, "https://api.anthropic.com/v1/messages");
        assert_eq!(client.model(), "claude-test");
        assert_eq!(client.headers["anthropic-version"], ANTHROPIC_VERSION);
    }

    #[test]
    fn test_new_rejects_missing_key() {
        let err = LlmClient::new(config("")).err().unwrap();
        assert!(matches!(err, SleuthError::MissingConfig { .. }));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let mut cfg = config("sk-ant-test");
        cfg.base_url = "api.anthropic.com".to_string();
        let err = LlmClient::new(cfg).err().unwrap();
        assert!(matches!(err, SleuthError::InvalidConfig { .. }));
    }

    #[test]
    fn test_next_delay_grows_and_caps() {
        let d = next_delay(Duration::from_secs(3));
        assert!(d >= Duration::from_millis(5500) && d <= Duration::from_millis(6500));
        assert_eq!(next_delay(Duration::from_secs(50)), MAX_BACKOFF);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
    }

    fn stub_client(base_url: &str, max_retries: u32, base_delay: Duration) -> LlmClient {
        let mut cfg = LlmConfig::new(base_url.to_string(), "claude-test".to_string(), "sk-ant-test".to_string())
            .with_max_retries(max_retries)
            .with_timeout(Duration::from_secs(5));
        cfg.retry_base_delay = base_delay;
        LlmClient::new(cfg).unwrap()
    }

    fn request() -> MessageRequest {
        MessageRequest::new("claude-test", 64, vec![Message::user_text("hello")])
    }

    const OK_BODY: &str = r#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"Hi there"}],"stop_reason":"end_turn","usage":{"input_tokens":3,"output_tokens":2}}"#;

    #[tokio::test]
    async fn test_success_sends_anthropic_headers() {
        let server = StubServer::start(vec![json_response(200, "OK", OK_BODY)]).await;
        let client = stub_client(&server.base_url, 0, Duration::from_millis(10));

        let response = client.create_message(&request()).await.unwrap();
        assert_eq!(response.text(), "Hi there");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage.output_tokens, 2);

        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/v1/messages");
        assert_eq!(seen[0].header("x-api-key"), Some("sk-ant-test"));
        assert_eq!(seen[0].header("anthropic-version"), Some(ANTHROPIC_VERSION));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn test_unauthorized_carries_provider_message() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let server = StubServer::start(vec![json_response(401, "Unauthorized", body)]).await;
        let client = stub_client(&server.base_url, 3, Duration::from_millis(10));

        let err = client.create_message(&request()).await.unwrap_err();
        assert!(matches!(err, SleuthError::Unauthorized { ref message } if message == "invalid x-api-key"));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#;
        let server = StubServer::start(vec![json_response(400, "Bad Request", body)]).await;
        let client = stub_client(&server.base_url, 3, Duration::from_millis(10));

        let err = client.create_message(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            SleuthError::ProviderError { status: 400, ref message } if message == "max_tokens too large"
        ));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let limited = http_response(429, "Too Many Requests", &[("Retry-After", "0")], "{}");
        let server = StubServer::start(vec![limited.clone(), limited]).await;
        let client = stub_client(&server.base_url, 1, Duration::from_millis(10));

        let err = client.create_message(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            SleuthError::RateLimitExceeded { retry_after: Some(d) } if d == Duration::ZERO
        ));
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_after_overrides_backoff() {
        let server = StubServer::start(vec![
            http_response(429, "Too Many Requests", &[("Retry-After", "0")], "{}"),
            json_response(200, "OK", OK_BODY),
        ])
        .await;
        // the 30s base delay would blow the deadline if Retry-After were ignored
        let client = stub_client(&server.base_url, 2, Duration::from_secs(30));

        let response = tokio::time::timeout(Duration::from_secs(5), client.create_message(&request()))
            .await
            .expect("Retry-After: 0 should retry immediately")
            .unwrap();
        assert_eq!(response.text(), "Hi there");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_then_success() {
        let server = StubServer::start(vec![
            json_response(529, "Overloaded", r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#),
            json_response(500, "Internal Server Error", "{}"),
            json_response(200, "OK", OK_BODY),
        ])
        .await;
        let client = stub_client(&server.base_url, 3, Duration::from_millis(10));

        let response = client.create_message(&request()).await.unwrap();
        assert_eq!(response.text(), "Hi there");
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_connection_failed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = stub_client(&base_url, 1, Duration::from_millis(10));

        let err = client.create_message(&request()).await.unwrap_err();
        assert!(matches!(err, SleuthError::ConnectionFailed { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_extract_error_message() {
        let body = json!({"type": "error", "error": {"type": "invalid_request_error", "message": "max_tokens too large"}});
        assert_eq!(extract_error_message(Some(&body)), "max_tokens too large");
        assert_eq!(extract_error_message(None), "Unknown error");
    }
}
