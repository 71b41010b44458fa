//! Provider factory pattern for dynamic LLM provider registration.
//!
//! Providers register factories that create instances from configuration,
//! so the screener never names a concrete backend.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create("gemini", &config.provider_config, None)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{ApiCredential, LlmProvider, ProviderError};

/// Factory for creating LLM providers from configuration.
///
/// Each factory is responsible for:
/// 1. Validating its configuration format
/// 2. Creating provider instances
/// 3. Providing a unique type identifier
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "gemini".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON configuration.
    ///
    /// # Arguments
    /// * `config` - Provider-specific configuration as JSON
    /// * `credential` - A credential obtained elsewhere (e.g. typed in by the
    ///   user). Takes precedence over anything `config` or the environment holds.
    ///
    /// # Security
    /// Implementations keep the key in an [`ApiCredential`] and must not put
    /// it in error messages or logs.
    fn create(
        &self,
        config: &JsonValue,
        credential: Option<ApiCredential>,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate configuration without creating a provider.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    /// Get default configuration for this provider.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "LLM Provider"
    }
}

/// What a registered provider is and how to configure it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub provider_type: String,
    pub description: &'static str,
    pub default_config: JsonValue,
}

/// Registry of available provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }

    /// Create a provider from type name and configuration.
    ///
    /// The configuration is validated by the factory before anything is built.
    ///
    /// # Arguments
    /// * `provider_type` - Registered type, e.g. "gemini"
    /// * `config` - The `provider_config` section of the screener config
    /// * `credential` - Explicit credential; `None` lets the factory look in
    ///   `config` and then the environment
    ///
    /// # Errors
    /// `ProviderError::NotConfigured` for an unknown type, or whatever the
    /// factory reports for invalid configuration or a missing credential.
    ///
    /// # Example
    /// ```ignore
    /// let registry = ProviderRegistry::with_defaults();
    /// let provider = registry.create("gemini", &serde_json::json!({}), None)?;
    /// assert_eq!(provider.name(), "gemini");
    /// ```
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
        credential: Option<ApiCredential>,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory(provider_type)?;
        factory.validate_config(config)?;
        factory.create(config, credential)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Describe every registered provider, sorted by type.
    pub fn catalog(&self) -> Vec<ProviderInfo> {
        self.factories
            .iter()
            .map(|(provider_type, factory)| ProviderInfo {
                provider_type: provider_type.clone(),
                description: factory.description(),
                default_config: factory.default_config(),
            })
            .collect()
    }

    /// Create a registry with all built-in providers registered.
    #[cfg(feature = "gemini")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::GeminiProviderFactory));
        registry
    }

    /// Create a registry with all built-in providers registered.
    #[cfg(not(feature = "gemini"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
