//! Credential handling for LLM providers.
//!
//! Keys are wrapped in [`secrecy::SecretString`] as soon as they are read:
//!
//! - **No accidental logging**: credentials never appear in Debug/Display output
//! - **Zeroed on drop**: handled by `secrecy`
//! - **Explicit exposure**: the raw value is only reachable through `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! use crate::providers::secrets::{ApiCredential, CredentialSource};
//!
//! // Load from config with env fallback
//! let cred = ApiCredential::from_config_or_env(&config, "api_key", "GOOGLE_API_KEY", "Google API key")?;
//! cred.check_prefix("AIza")?;
//!
//! // Use in HTTP header (explicit exposure)
//! request.header("x-goog-api-key", cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from configuration file/JSON
    Config,
    /// Loaded from environment variable
    Environment,
    /// Typed in by the user at a prompt
    Interactive,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Interactive => write!(f, "interactive input"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// Debug and Display show `[REDACTED]`; the value is only available via
/// [`ApiCredential::expose`].
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Wrap a raw value. Surrounding whitespace (e.g. a pasted newline) is dropped.
    ///
    /// # Arguments
    /// * `value` - The raw key. It is moved into a `SecretString` immediately.
    /// * `source` - Where the key came from, shown in errors and logs
    /// * `name` - Human-readable name such as "Google API key"
    ///
    /// # Example
    /// ```ignore
    /// let cred = ApiCredential::new(line, CredentialSource::Interactive, "Google API key");
    /// assert_eq!(cred.to_string(), "Google API key from interactive input [REDACTED]");
    /// ```
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        let value: String = value.into();
        Self {
            value: SecretString::from(value.trim().to_string()),
            source,
            name,
        }
    }

    /// Load credential from an environment variable.
    ///
    /// # Errors
    /// [`ProviderError::NotConfigured`] naming the variable when it is unset.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        std::env::var(env_var)
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .map_err(|_| {
                ProviderError::NotConfigured(format!(
                    "{} not set: configure '{}' environment variable",
                    name, env_var
                ))
            })
    }

    /// Load credential from JSON config, falling back to an environment variable.
    ///
    /// # Arguments
    /// * `config` - Provider configuration object
    /// * `config_key` - Key holding the credential in `config`, e.g. "api_key"
    /// * `env_var` - Environment variable consulted when the key is absent
    /// * `name` - Human-readable name used in error messages
    ///
    /// # Security
    /// A key in a config file is readable by anyone who can read the file.
    /// Prefer the environment variable or interactive entry.
    ///
    /// # Example
    /// ```ignore
    /// let cred = ApiCredential::from_config_or_env(
    ///     &serde_json::json!({}),
    ///     "api_key",
    ///     "GOOGLE_API_KEY",
    ///     "Google API key",
    /// )?;
    /// assert_eq!(cred.source(), CredentialSource::Environment);
    /// ```
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = config[config_key].as_str() {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        Self::from_env(env_var, name).map_err(|_| {
            ProviderError::NotConfigured(format!(
                "{} required: set '{}' in config or {} environment variable",
                name, config_key, env_var
            ))
        })
    }

    /// Superficial validity check against a vendor key prefix.
    ///
    /// This only catches obviously wrong input (an empty field, a key for a
    /// different vendor). It proves nothing about the key itself.
    ///
    /// # Errors
    /// [`ProviderError::InvalidCredential`] for an empty key or a prefix
    /// mismatch. The message names the credential and its source only.
    ///
    /// # Example
    /// ```ignore
    /// let cred = ApiCredential::new("sk-ant-xyz", CredentialSource::Config, "Google API key");
    /// assert!(cred.check_prefix("AIza").is_err());
    /// ```
    pub fn check_prefix(&self, prefix: &str) -> Result<(), ProviderError> {
        if self.is_empty() {
            return Err(ProviderError::InvalidCredential(format!(
                "{} from {} is empty",
                self.name, self.source
            )));
        }
        if !self.value.expose_secret().starts_with(prefix) {
            return Err(ProviderError::InvalidCredential(format!(
                "{} from {} does not look valid (expected prefix '{}')",
                self.name, self.source, prefix
            )));
        }
        Ok(())
    }

    /// Expose the credential value for use in API calls.
    ///
    /// Only call this at the point where the credential is actually needed
    /// (e.g., setting an HTTP header). Never store the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "AIzaSyD-super-secret-key-12345";

    #[test]
    fn test_credential_redacted_in_debug_and_display() {
        let cred = ApiCredential::new(SECRET, CredentialSource::Interactive, "Google API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(SECRET), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));

        let display = format!("{}", cred);
        assert!(!display.contains(SECRET), "Secret exposed in Display!");
        assert!(display.contains("Google API key"));
        assert!(display.contains("interactive input"));
    }

    #[test]
    fn test_pasted_whitespace_is_trimmed() {
        let cred = ApiCredential::new(format!("  {}\n", SECRET), CredentialSource::Interactive, "k");
        assert_eq!(cred.expose(), SECRET);
    }

    #[test]
    fn test_check_prefix_accepts_matching_key() {
        let cred = ApiCredential::new(SECRET, CredentialSource::Programmatic, "Google API key");
        assert!(cred.check_prefix("AIza").is_ok());
    }

    #[test]
    fn test_check_prefix_rejects_other_vendor_without_leaking() {
        let other = "sk-ant-super-secret";
        let cred = ApiCredential::new(other, CredentialSource::Config, "Google API key");

        let err = cred.check_prefix("AIza").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCredential(_)));
        assert!(err.to_string().contains("AIza"));
        assert!(!err.to_string().contains(other));
    }

    #[test]
    fn test_check_prefix_rejects_empty() {
        let cred = ApiCredential::new("   ", CredentialSource::Interactive, "Google API key");
        let err = cred.check_prefix("AIza").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_from_config_or_env_prefers_config() {
        let config = serde_json::json!({ "api_key": "config-key" });

        std::env::set_var("SCREENER_TEST_KEY_PRIORITY", "env-key");
        let cred = ApiCredential::from_config_or_env(
            &config,
            "api_key",
            "SCREENER_TEST_KEY_PRIORITY",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);

        std::env::remove_var("SCREENER_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_from_config_or_env_falls_back_to_env() {
        let config = serde_json::json!({});

        std::env::set_var("SCREENER_TEST_KEY_FALLBACK", "env-key");
        let cred = ApiCredential::from_config_or_env(
            &config,
            "api_key",
            "SCREENER_TEST_KEY_FALLBACK",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);

        std::env::remove_var("SCREENER_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_from_config_or_env_error_when_missing() {
        let result = ApiCredential::from_config_or_env(
            &serde_json::json!({}),
            "api_key",
            "SCREENER_NONEXISTENT_VAR_12345",
            "Test key",
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Test key"));
        assert!(err.to_string().contains("SCREENER_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_from_env_names_missing_variable() {
        let err = ApiCredential::from_env("SCREENER_NONEXISTENT_VAR_67890", "Test key").unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("SCREENER_NONEXISTENT_VAR_67890"));
    }
}
