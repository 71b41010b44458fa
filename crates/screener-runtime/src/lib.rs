//! # screener-runtime
//!
//! LLM-backed resume evaluation for Screener.
//!
//! This crate owns everything that touches the network: providers,
//! credentials, prompts and the batch pipeline. Normalization and reply
//! decoding live in `screener-core` and stay deterministic.
//!
//! ## Example
//!
//! ```rust,ignore
//! use screener_runtime::{ProviderRegistry, Screener, ScreenerConfig};
//!
//! let config = ScreenerConfig::from_file("screener.yaml")?;
//! let provider = ProviderRegistry::with_defaults()
//!     .create(&config.provider, &config.provider_config, None)?;
//!
//! let screener = Screener::new(provider, config)?;
//! for result in screener.screen(files, &job_description).await {
//!     println!("{}: {:?}", result.file_name, result.record());
//! }
//! ```

mod config;
pub mod prompts;
pub mod providers;
mod screener;

pub use config::{ConfigError, ScreenerConfig};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, ContentPart,
    CredentialSource, LlmProvider, ProviderError, ProviderFactory, ProviderInfo, ProviderRegistry,
    TokenUsage,
};
pub use screener::{FileEvaluation, FileOutcome, ScreenError, Screener, ScreenerBuilder};

#[cfg(feature = "gemini")]
pub use providers::{GeminiProvider, GOOGLE_API_KEY_ENV, GOOGLE_API_KEY_PREFIX};
