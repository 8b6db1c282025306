//! Client configuration.

use ragstream_streaming::{ParserConfig, DEFAULT_ERROR_PREFIX};
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Environment variable holding the base URL.
pub const API_URL_ENV: &str = "RAGSTREAM_API_URL";
/// Environment variable holding the bearer token.
pub const API_TOKEN_ENV: &str = "RAGSTREAM_API_TOKEN";

const ASK_PATH: &str = "ask";

/// Configuration for [`AskClient`](crate::AskClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the answer service.
    pub base_url: String,
    /// Bearer token sent with each request.
    pub api_token: Option<String>,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    /// Prefix of the error indicator written into a failed answer.
    pub error_prefix: String,
    /// Frame parser settings.
    pub parser: ParserConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            connect_timeout: Duration::from_secs(10),
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
            parser: ParserConfig::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("error_prefix", &self.error_prefix)
            .field("parser", &self.parser)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        config.api_token = lookup(API_TOKEN_ENV).filter(|v| !v.is_empty());
        config
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the bearer token.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the error indicator prefix.
    pub fn error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_prefix = prefix.into();
        self
    }

    /// Set the frame parser config.
    pub fn parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// URL of the ask endpoint.
    pub fn endpoint(&self) -> ClientResult<Url> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| ClientError::config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(ASK_PATH)
            .map_err(|e| ClientError::config(format!("invalid ask endpoint: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.endpoint().unwrap().as_str(), "http://localhost:8000/ask");
        assert!(config.api_token.is_none());
        assert_eq!(config.error_prefix, DEFAULT_ERROR_PREFIX);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ClientConfig::new().base_url("https://example.com/api/v1");
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "https://example.com/api/v1/ask"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ClientConfig::new().base_url("not a url").endpoint().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (API_URL_ENV, " http://rag.internal:9000 "),
            (API_TOKEN_ENV, "secret"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://rag.internal:9000");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_from_lookup_empty() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new().api_token("secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
