//! Client configuration: credentials, endpoint base URLs and transport options.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::ClientError;

/// Base URL of the text generation model (generateContent, countTokens, streaming).
pub const DEFAULT_TEXT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-pro";

/// Base URL of the vision model used for image prompts.
pub const DEFAULT_IMAGE_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-vision";

/// Base URL of the model metadata collection.
pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Base URL under which embedding models are addressed.
pub const DEFAULT_EMBEDDING_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Settings for a [`GeminiClient`](crate::GeminiClient).
///
/// Each capability has its own base URL so that, for example, image prompts
/// can target a vision model while text prompts target a text model.
///
/// # Example
/// ```rust
/// use gemini_sdk::options::GeminiConfig;
///
/// let config = GeminiConfig::new("my-api-key")
///     .with_text_base_url("https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash");
/// assert!(config.text_base_url.ends_with("gemini-1.5-flash"));
/// ```
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key, sent as the `key` query parameter.
    pub api_key: SecretString,

    /// Base URL for text generation, token counting and streaming.
    pub text_base_url: String,

    /// Base URL for image (vision) prompts.
    pub image_base_url: String,

    /// Base URL for model lookup and listing.
    pub model_base_url: String,

    /// Base URL for embedding models.
    pub embedding_base_url: String,
}

impl GeminiConfig {
    /// Create a configuration pointing at the production endpoints.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            text_base_url: DEFAULT_TEXT_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            embedding_base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// `GEMINI_API_KEY` is required. `GEMINI_TEXT_BASE_URL`,
    /// `GEMINI_IMAGE_BASE_URL`, `GEMINI_MODEL_BASE_URL` and
    /// `GEMINI_EMBEDDING_BASE_URL` override the matching defaults when set.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ClientError::Config("GEMINI_API_KEY not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(url) = lookup("GEMINI_TEXT_BASE_URL") {
            config = config.with_text_base_url(url);
        }
        if let Some(url) = lookup("GEMINI_IMAGE_BASE_URL") {
            config = config.with_image_base_url(url);
        }
        if let Some(url) = lookup("GEMINI_MODEL_BASE_URL") {
            config = config.with_model_base_url(url);
        }
        if let Some(url) = lookup("GEMINI_EMBEDDING_BASE_URL") {
            config = config.with_embedding_base_url(url);
        }
        Ok(config)
    }

    /// Point every capability at the same host, keeping the default paths.
    ///
    /// Mostly useful against a local mock server.
    pub fn with_host(self, host: impl AsRef<str>) -> Self {
        const PRODUCTION_HOST: &str = "https://generativelanguage.googleapis.com";
        let host = host.as_ref().trim_end_matches('/');
        let rebase = |url: &str| url.replacen(PRODUCTION_HOST, host, 1);
        Self {
            text_base_url: rebase(&self.text_base_url),
            image_base_url: rebase(&self.image_base_url),
            model_base_url: rebase(&self.model_base_url),
            embedding_base_url: rebase(&self.embedding_base_url),
            api_key: self.api_key,
        }
    }

    /// Set the text generation base URL.
    pub fn with_text_base_url(mut self, url: impl Into<String>) -> Self {
        self.text_base_url = normalize_base_url(url.into());
        self
    }

    /// Set the image prompt base URL.
    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = normalize_base_url(url.into());
        self
    }

    /// Set the model metadata base URL.
    pub fn with_model_base_url(mut self, url: impl Into<String>) -> Self {
        self.model_base_url = normalize_base_url(url.into());
        self
    }

    /// Set the embedding base URL.
    pub fn with_embedding_base_url(mut self, url: impl Into<String>) -> Self {
        self.embedding_base_url = normalize_base_url(url.into());
        self
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// HTTP transport options used to build the default `reqwest` transport.
///
/// # Example
/// ```rust
/// use gemini_sdk::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("x-request-source".to_string(), "docs".to_string());
/// assert_eq!(options.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Request timeout. `None` leaves the `reqwest` default in place.
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| owned.get(name).cloned()
    }

    #[test]
    fn test_defaults_use_production_endpoints() {
        let config = GeminiConfig::new("key");
        assert_eq!(config.text_base_url, DEFAULT_TEXT_BASE_URL);
        assert_eq!(config.image_base_url, DEFAULT_IMAGE_BASE_URL);
        assert_eq!(config.model_base_url, DEFAULT_MODEL_BASE_URL);
        assert_eq!(config.embedding_base_url, DEFAULT_EMBEDDING_BASE_URL);
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = GeminiConfig::new("super-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_overrides_trim_trailing_slash() {
        let config = GeminiConfig::new("key").with_model_base_url("http://localhost:8080/models/");
        assert_eq!(config.model_base_url, "http://localhost:8080/models");
    }

    #[test]
    fn test_with_host_rebases_every_endpoint() {
        let config = GeminiConfig::new("key").with_host("http://127.0.0.1:9000/");
        assert_eq!(
            config.text_base_url,
            "http://127.0.0.1:9000/v1/models/gemini-pro"
        );
        assert_eq!(
            config.image_base_url,
            "http://127.0.0.1:9000/v1beta/models/gemini-pro-vision"
        );
        assert_eq!(config.model_base_url, "http://127.0.0.1:9000/v1beta/models");
        assert_eq!(
            config.embedding_base_url,
            "http://127.0.0.1:9000/v1beta/models"
        );
    }

    #[test]
    fn test_from_env_requires_api_key() {
        let err = GeminiConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = GeminiConfig::from_lookup(env(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_from_env_applies_overrides() {
        let config = GeminiConfig::from_lookup(env(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_TEXT_BASE_URL", "http://text/"),
            ("GEMINI_EMBEDDING_BASE_URL", "http://embed"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.expose_secret(), "abc");
        assert_eq!(config.text_base_url, "http://text");
        assert_eq!(config.embedding_base_url, "http://embed");
        assert_eq!(config.image_base_url, DEFAULT_IMAGE_BASE_URL);
    }

    #[test]
    fn test_transport_options_with_header() {
        let options = TransportOptions::new()
            .with_header("a".to_string(), "1".to_string())
            .with_header("b".to_string(), "2".to_string());
        let headers = options.extra_headers.unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["a"], "1");
    }
}
