//! Structured error types for Sleuth
//!
//! Provides type-safe error handling for the LLM transport, tool dispatch
//! and configuration, with user-friendly messages for the CLI.

use std::time::Duration;
use thiserror::Error;

/// Primary error type for Sleuth operations
#[derive(Error, Debug)]
pub enum SleuthError {
    // =========================================================================
    // Provider / API Errors
    // =========================================================================
    /// Authentication/authorization errors (401)
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded (429) after all retries
    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// Provider returned a non-success status
    #[error("provider error: {status} - {message}")]
    ProviderError { status: u16, message: String },

    /// Provider answered with a body we could not understand
    #[error("invalid provider response: {message}")]
    InvalidResponse { message: String },

    // =========================================================================
    // Tool Execution Errors
    // =========================================================================
    /// Tool not found
    #[error("tool not found: {tool_name}")]
    ToolNotFound { tool_name: String },

    /// Tool execution failed
    #[error("tool execution failed: {tool_name} - {error}")]
    ToolExecutionFailed { tool_name: String, error: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Missing required config
    #[error("missing required configuration: {key}")]
    MissingConfig { key: String },

    // =========================================================================
    // Network / System Errors
    // =========================================================================
    /// Network/connection error
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Timeout
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal system error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SleuthError {
    /// Check if error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::RateLimitExceeded { .. } => {
                true
            }

            Self::ProviderError { status, .. } => Self::is_retryable_status(*status),

            Self::Unauthorized { .. }
            | Self::InvalidResponse { .. }
            | Self::ToolNotFound { .. }
            | Self::ToolExecutionFailed { .. }
            | Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// 429, any 5xx, and Anthropic's 529 "overloaded"
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => {
                "Authentication failed. Please check ANTHROPIC_API_KEY.".to_string()
            }
            Self::RateLimitExceeded { .. } => {
                "Rate limit exceeded. Please try again later.".to_string()
            }
            Self::MissingConfig { key } => {
                format!("Missing {}. Add it to your .env file or sleuth.yaml.", key)
            }
            Self::Timeout { duration } => {
                format!("The model did not answer within {}s.", duration.as_secs())
            }
            _ => self.to_string(),
        }
    }

    /// Map a reqwest transport error onto our taxonomy
    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { duration: timeout }
        } else if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else if err.is_builder() {
            Self::Internal {
                message: err.to_string(),
            }
        } else {
            Self::ConnectionFailed {
                message: err.to_string(),
            }
        }
    }
}

/// Result type alias using SleuthError
pub type Result<T> = std::result::Result<T, SleuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SleuthError::Timeout {
            duration: Duration::from_secs(30)
        }
        .is_retryable());

        assert!(SleuthError::ProviderError {
            status: 529,
            message: "overloaded".to_string()
        }
        .is_retryable());

        assert!(!SleuthError::ProviderError {
            status: 400,
            message: "bad request".to_string()
        }
        .is_retryable());

        assert!(!SleuthError::Unauthorized {
            message: "bad key".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(SleuthError::is_retryable_status(429));
        assert!(SleuthError::is_retryable_status(502));
        assert!(SleuthError::is_retryable_status(529));
        assert!(!SleuthError::is_retryable_status(400));
        assert!(!SleuthError::is_retryable_status(401));
    }

    #[test]
    fn test_user_messages() {
        let err = SleuthError::MissingConfig {
            key: "SERPER_API_KEY".to_string(),
        };
        assert!(err.user_message().contains("SERPER_API_KEY"));

        let err = SleuthError::Unauthorized {
            message: "invalid x-api-key".to_string(),
        };
        assert!(err.user_message().contains("ANTHROPIC_API_KEY"));
    }
}
