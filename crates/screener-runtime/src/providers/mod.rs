//! LLM Provider abstractions for screener-runtime.
//!
//! This module defines the trait for multimodal LLM providers and the
//! Gemini implementation used to evaluate resume images.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::{ProviderFactory, ProviderInfo, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory, GOOGLE_API_KEY_ENV, GOOGLE_API_KEY_PREFIX};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Model returned no content{}", .0.as_deref().map(|r| format!(" (finish reason: {})", r)).unwrap_or_default())]
    EmptyResponse(Option<String>),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Ask the provider for a JSON-only reply
    pub json_output: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            json_output: true,
        }
    }
}

/// One piece of message content.
#[derive(Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image { mime: String, data: Vec<u8> },
}

impl fmt::Debug for ContentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentPart::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ContentPart::Image { mime, data } => f
                .debug_struct("Image")
                .field("mime", mime)
                .field("len", &data.len())
                .finish(),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content, in order
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![ContentPart::Text(content.into())],
        }
    }

    /// Create a text-only user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![ContentPart::Text(content.into())],
        }
    }

    /// Create a user message with an image followed by text.
    pub fn user_with_image(
        content: impl Into<String>,
        mime: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                ContentPart::Image {
                    mime: mime.into(),
                    data,
                },
                ContentPart::Text(content.into()),
            ],
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            parts: vec![ContentPart::Text(content.into())],
        }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model used
    pub model: String,

    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    /// Tokens in the prompt (image included)
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// This is the only place where model calls are made. Calls are made
/// exactly once per request: providers do not retry.
///
/// # Example
///
/// ```ignore
/// struct Canned;
///
/// #[async_trait]
/// impl LlmProvider for Canned {
///     async fn complete(
///         &self,
///         _messages: Vec<ChatMessage>,
///         config: &CompletionConfig,
///     ) -> Result<CompletionResponse, ProviderError> {
///         Ok(CompletionResponse {
///             content: r#"{"candidate_name": "Jane Doe", ...}"#.to_string(),
///             usage: TokenUsage::default(),
///             model: config.model.clone(),
///             stop_reason: None,
///         })
///     }
///
///     async fn health_check(&self) -> bool {
///         true
///     }
///
///     fn name(&self) -> &str {
///         "canned"
///     }
/// }
/// ```
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if provider is ready to serve requests.
    ///
    /// Called once before a batch starts. It must not spend a model call.
    async fn health_check(&self) -> bool;

    /// Get provider name for logs.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // ~4 chars per token
        (text.len() / 4) as u32
    }
}
