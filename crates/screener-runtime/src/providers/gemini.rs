//! Google Gemini provider implementation.
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! Images travel inline as base64 `inlineData` parts next to the prompt text.
//!
//! ## Security
//!
//! The API key goes in the `x-goog-api-key` header, never in the URL, so it
//! cannot leak through request logging. See the [`secrets`](super::secrets)
//! module for how the key is held in memory.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, ContentPart, LlmProvider, ProviderError,
    TokenUsage,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable name for the Google API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Every Google API key starts with this.
pub const GOOGLE_API_KEY_PREFIX: &str = "AIza";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const CREDENTIAL_NAME: &str = "Google API key";

/// Google Gemini provider.
///
/// # Security
///
/// The API key is stored using [`ApiCredential`] which:
/// - Cannot be accidentally printed via `Debug` or `Display`
/// - Is zeroed on drop
/// - Must be explicitly exposed via `.expose()` when needed
///
/// # Example
///
/// ```ignore
/// use screener_runtime::{ChatMessage, CompletionConfig, GeminiProvider, LlmProvider};
///
/// let provider = GeminiProvider::from_config(&serde_json::json!({}), None)?;
/// let reply = provider
///     .complete(
///         vec![ChatMessage::user_with_image("Rate this resume", "image/png", png_bytes)],
///         &CompletionConfig::default(),
///     )
///     .await?;
/// println!("{}", reply.content);
/// ```
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider from a raw API key without checking its shape.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(api_key, CredentialSource::Programmatic, CREDENTIAL_NAME),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a provider from an already loaded credential.
    ///
    /// # Arguments
    /// * `credential` - The Google API key, from any [`CredentialSource`]
    ///
    /// # Errors
    /// [`ProviderError::InvalidCredential`] when the key does not carry the
    /// Google key prefix. The error names the credential, never its value.
    ///
    /// # Example
    /// ```ignore
    /// let key = ApiCredential::from_env(GOOGLE_API_KEY_ENV, "Google API key")?;
    /// let provider = GeminiProvider::from_credential(key)?;
    /// ```
    pub fn from_credential(credential: ApiCredential) -> Result<Self, ProviderError> {
        credential.check_prefix(GOOGLE_API_KEY_PREFIX)?;
        tracing::debug!(source = %credential.source(), "Using Google API key");
        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Create from JSON configuration with environment fallback.
    ///
    /// 1. Uses `credential` when one is given
    /// 2. Otherwise checks for `api_key` in the config
    /// 3. Falls back to the `GOOGLE_API_KEY` environment variable
    ///
    /// # Arguments
    /// * `config` - Provider configuration; recognises `api_key` and `base_url`
    /// * `credential` - Explicit credential that overrides `config` and the
    ///   environment, e.g. a key typed in at a prompt
    ///
    /// # Errors
    /// [`ProviderError::NotConfigured`] when no key is found anywhere, and
    /// [`ProviderError::InvalidCredential`] when the key is malformed.
    ///
    /// # Example
    /// ```ignore
    /// let config = serde_json::json!({ "base_url": "http://localhost:8080/v1beta" });
    /// let provider = GeminiProvider::from_config(&config, None)?;
    /// ```
    pub fn from_config(
        config: &JsonValue,
        credential: Option<ApiCredential>,
    ) -> Result<Self, ProviderError> {
        let credential = match credential {
            Some(c) => c,
            None => ApiCredential::from_config_or_env(
                config,
                "api_key",
                GOOGLE_API_KEY_ENV,
                CREDENTIAL_NAME,
            )?,
        };

        let provider = Self::from_credential(credential)?;
        Ok(match config["base_url"].as_str() {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

/// Gemini API request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn to_gemini_part(part: ContentPart) -> GeminiPart {
    match part {
        ContentPart::Text(text) => GeminiPart {
            text: Some(text),
            ..Default::default()
        },
        ContentPart::Image { mime, data } => GeminiPart {
            inline_data: Some(InlineData {
                mime_type: mime,
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            ..Default::default()
        },
    }
}

fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> GeminiRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for msg in messages {
        let parts: Vec<GeminiPart> = msg.parts.into_iter().map(to_gemini_part).collect();
        match msg.role.as_str() {
            "system" => system_parts.extend(parts),
            "assistant" => contents.push(GeminiContent {
                role: Some("model".to_string()),
                parts,
            }),
            _ => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts,
            }),
        }
    }

    GeminiRequest {
        system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        }),
        contents,
        generation_config: GenerationConfig {
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
            response_mime_type: config.json_output.then_some("application/json"),
        },
    }
}

fn parse_response(
    body: GeminiResponse,
    requested_model: &str,
) -> Result<CompletionResponse, ProviderError> {
    let usage = body.usage_metadata.unwrap_or_default();
    let block_reason = body.prompt_feedback.and_then(|f| f.block_reason);

    let Some(candidate) = body.candidates.into_iter().next() else {
        return Err(ProviderError::EmptyResponse(block_reason));
    };

    let content = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse(candidate.finish_reason));
    }

    Ok(CompletionResponse {
        content,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
        },
        model: body
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        stop_reason: candidate.finish_reason,
    })
}

fn error_for_status(status: u16, body: &str, retry_after: Option<Duration>) -> ProviderError {
    let (message, api_status) = match serde_json::from_str::<GeminiError>(body) {
        Ok(e) => (e.error.message, e.error.status),
        Err(_) => (body.trim().to_string(), None),
    };

    let bad_key = status == 400
        && (message.contains("API key") || api_status.as_deref() == Some("UNAUTHENTICATED"));

    match status {
        401 | 403 => ProviderError::AuthError(message),
        429 => ProviderError::RateLimited { retry_after },
        _ if bad_key => ProviderError::AuthError(message),
        _ => ProviderError::ApiError { status, message },
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(messages, config);

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.endpoint(&config.model))
            .header("x-goog-api-key", self.credential.expose())
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body, retry_after));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parse_response(body, &config.model)
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Factory for creating Gemini providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "AIza...",       // Optional, falls back to GOOGLE_API_KEY env
///   "base_url": "https://..."   // Optional, custom API endpoint
/// }
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn create(
        &self,
        config: &JsonValue,
        credential: Option<ApiCredential>,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(GeminiProvider::from_config(config, credential)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        if let Some(key) = config["api_key"].as_str() {
            ApiCredential::new(key, CredentialSource::Config, CREDENTIAL_NAME)
                .check_prefix(GOOGLE_API_KEY_PREFIX)?;
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "base_url": DEFAULT_BASE_URL })
    }

    fn description(&self) -> &'static str {
        "Google Gemini provider with inline image input"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "AIzaSyD-super-secret-key-12345";

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new("test-key");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(
            provider.endpoint("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let provider = GeminiProvider::new(KEY).with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            provider.endpoint("m"),
            "http://localhost:8080/v1/models/m:generateContent"
        );
    }

    #[test]
    fn test_from_credential_rejects_wrong_prefix() {
        let cred = ApiCredential::new("sk-ant-123", CredentialSource::Interactive, CREDENTIAL_NAME);
        let err = GeminiProvider::from_credential(cred).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCredential(_)));
    }

    #[test]
    fn test_from_config_uses_explicit_credential() {
        let config = serde_json::json!({ "api_key": "AIza-from-config" });
        let cred = ApiCredential::new("AIza-typed", CredentialSource::Interactive, CREDENTIAL_NAME);

        let provider = GeminiProvider::from_config(&config, Some(cred)).unwrap();
        assert_eq!(provider.credential.expose(), "AIza-typed");
        assert_eq!(provider.credential.source(), CredentialSource::Interactive);
    }

    #[test]
    fn test_from_config_with_api_key() {
        let config = serde_json::json!({
            "api_key": KEY,
            "base_url": "https://custom.api.com/v1"
        });

        let provider = GeminiProvider::from_config(&config, None).unwrap();
        assert_eq!(provider.base_url, "https://custom.api.com/v1");
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![
            ChatMessage::system("Be strict."),
            ChatMessage::user_with_image("Rate it", "image/png", vec![1, 2, 3]),
        ];
        let config = CompletionConfig::default();

        let json = serde_json::to_value(build_request(messages, &config)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be strict.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        assert_eq!(json["contents"][0]["role"], "user");

        let image = &json["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(image["mimeType"], "image/png");
        assert_eq!(image["data"], "AQID");
        assert!(json["contents"][0]["parts"][0].get("text").is_none());
        assert_eq!(json["contents"][0]["parts"][1]["text"], "Rate it");

        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_request_without_json_output() {
        let config = CompletionConfig {
            json_output: false,
            ..Default::default()
        };
        let json = serde_json::to_value(build_request(vec![ChatMessage::user("hi")], &config)).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_assistant_maps_to_model_role() {
        let req = build_request(
            vec![ChatMessage::user("a"), ChatMessage::assistant("b")],
            &CompletionConfig::default(),
        );
        assert_eq!(req.contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_parse_response_joins_text_parts() {
        let body: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "(\"Jane\"," }, { "text": " ...)" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 1290, "candidatesTokenCount": 120 },
            "modelVersion": "gemini-1.5-flash-002"
        }))
        .unwrap();

        let resp = parse_response(body, "gemini-1.5-flash").unwrap();
        assert_eq!(resp.content, "(\"Jane\", ...)");
        assert_eq!(resp.usage.total(), 1410);
        assert_eq!(resp.model, "gemini-1.5-flash-002");
        assert_eq!(resp.stop_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_parse_response_no_candidates_is_empty() {
        let body: GeminiResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        match parse_response(body, "m") {
            Err(ProviderError::EmptyResponse(reason)) => assert_eq!(reason.as_deref(), Some("SAFETY")),
            other => panic!("Expected EmptyResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_blank_text_is_empty() {
        let body: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] }, "finishReason": "MAX_TOKENS" }]
        }))
        .unwrap();

        assert!(matches!(
            parse_response(body, "m"),
            Err(ProviderError::EmptyResponse(Some(_)))
        ));
    }

    #[test]
    fn test_error_for_status() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        assert!(matches!(error_for_status(403, body, None), ProviderError::AuthError(m) if m == "Permission denied"));

        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(error_for_status(400, body, None), ProviderError::AuthError(_)));

        let retry = Some(Duration::from_secs(7));
        assert!(matches!(
            error_for_status(429, "", retry),
            ProviderError::RateLimited { retry_after } if retry_after == retry
        ));

        match error_for_status(500, "upstream exploded", None) {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_factory_validate() {
        let factory = GeminiProviderFactory;
        assert_eq!(factory.provider_type(), "gemini");
        assert!(factory.description().contains("Gemini"));

        assert!(factory.validate_config(&serde_json::json!({ "api_key": KEY })).is_ok());
        assert!(factory
            .validate_config(&serde_json::json!({ "api_key": KEY, "base_url": "invalid-url" }))
            .is_err());
        assert!(factory
            .validate_config(&serde_json::json!({ "api_key": "sk-ant-x" }))
            .is_err());
    }

    #[test]
    fn test_factory_create_with_api_key() {
        let provider = GeminiProviderFactory
            .create(&serde_json::json!({ "api_key": KEY }), None)
            .unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    // ==================== SECURITY TESTS ====================

    #[test]
    fn test_api_key_not_in_debug_output() {
        let provider = GeminiProvider::new(KEY);
        let debug_output = format!("{:?}", provider);

        assert!(!debug_output.contains(KEY), "API key was exposed in Debug output!");
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_api_key_not_in_url() {
        let provider = GeminiProvider::new(KEY);
        assert!(!provider.endpoint("gemini-1.5-flash").contains(KEY));
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(GeminiProvider::new(KEY).health_check().await);
        assert!(!GeminiProvider::new("").health_check().await);
    }
}
