//! Screener configuration from YAML/JSON.
//!
//! ```yaml
//! provider: gemini
//! provider_config:          # handed to the provider factory as-is
//!   base_url: https://generativelanguage.googleapis.com/v1beta
//! model: gemini-1.5-flash
//! timeout: 90s
//! max_concurrency: 4
//! render_dpi: 250
//! page_gap: 2               # pixels between stacked PDF pages, at most 100
//! response_format: json     # json | tuple | lines
//! strict_ranges: false
//! ```
//!
//! Every field is optional. Missing fields take the defaults below.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use screener_core::{DecodeOptions, DecodeStrategy};

use crate::providers::CompletionConfig;

/// Largest accepted gap between stacked PDF pages, in pixels.
const MAX_PAGE_GAP: u32 = 100;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Runtime configuration for a screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenerConfig {
    /// Registered provider type
    pub provider: String,

    /// Provider-specific options (`api_key`, `base_url`)
    pub provider_config: JsonValue,

    /// Model name passed to the provider
    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    /// Per-call timeout, e.g. "60s" or "2m"
    #[serde(with = "duration_str")]
    pub timeout: Duration,

    /// Upper bound on files evaluated at once
    pub max_concurrency: usize,

    /// PDF render resolution
    pub render_dpi: u16,

    /// Vertical pixels between stacked PDF pages
    pub page_gap: u32,

    /// Reply format requested from the model
    pub response_format: DecodeStrategy,

    /// Reject records with out-of-range ratings or percentage
    pub strict_ranges: bool,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            provider_config: JsonValue::Object(Default::default()),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            max_concurrency: 4,
            render_dpi: screener_core::document::DEFAULT_RENDER_DPI,
            page_gap: screener_core::document::DEFAULT_PAGE_GAP,
            response_format: DecodeStrategy::Json,
            strict_ranges: false,
        }
    }
}

impl ScreenerConfig {
    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ScreenerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ScreenerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Check value ranges. Called by the loaders; call again after
    /// applying overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::ValidationError("provider must not be empty".into()));
        }
        if !self.provider_config.is_object() {
            return Err(ConfigError::ValidationError(
                "provider_config must be a mapping".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationError("timeout must be greater than zero".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if !(36..=600).contains(&self.render_dpi) {
            return Err(ConfigError::ValidationError(format!(
                "render_dpi must be between 36 and 600, got {}",
                self.render_dpi
            )));
        }
        if self.page_gap > MAX_PAGE_GAP {
            return Err(ConfigError::ValidationError(format!(
                "page_gap must be at most {} pixels, got {}",
                MAX_PAGE_GAP, self.page_gap
            )));
        }
        Ok(())
    }

    /// Per-call settings for the provider.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            json_output: self.response_format == DecodeStrategy::Json,
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            strict_ranges: self.strict_ranges,
        }
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
