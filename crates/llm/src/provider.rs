use std::time::Duration;

use async_trait::async_trait;
use ragtune_core::RetryableError;
use serde::{Deserialize, Serialize};

/// A chat message for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Generated text plus whatever token accounting the backend reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// A chat backend. Retries and timeouts are layered on by [`crate::RetryingProvider`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
}

impl RetryableError for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::ApiError { status, .. } => {
                // 529 is Anthropic's "overloaded".
                *status == 408 || *status == 429 || *status >= 500
            }
            LlmError::Timeout(_) => true,
            LlmError::ParseError(_) | LlmError::NotConfigured(_) => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        LlmError::Timeout(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let api = |status| LlmError::ApiError {
            status,
            body: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(529).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(422).is_retryable());
        assert!(!LlmError::ParseError("x".into()).is_retryable());
        assert!(!LlmError::NotConfigured("x".into()).is_retryable());
        assert!(LlmError::timed_out(Duration::from_secs(3)).is_retryable());
    }
}
