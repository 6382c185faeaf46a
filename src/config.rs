//! Construction configuration loadable from JSON.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Settings a [`crate::Client`] is built from.
///
/// Every field has a default, so a partial document is accepted. Keys are
/// camelCase to match the web configuration files this is usually read from.
///
/// # Examples
///
/// ```
/// use restwell::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{ "baseUrl": "https://api.example.com", "timeoutMs": 2500 }"#)
///     .unwrap();
///
/// assert_eq!(config.base_url, "https://api.example.com");
/// assert!(config.with_credentials);
/// assert_eq!(config.timeout().as_millis(), 2500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL every request path is resolved against. Required.
    pub base_url: String,
    /// Keep and replay cookies the server sets.
    pub with_credentials: bool,
    /// Per-dispatch timeout in milliseconds.
    pub timeout_ms: u64,
    /// Initial remember-me token.
    pub remember_me_token: Option<String>,
    /// Initial browser fingerprint. A random one is generated when absent.
    pub browser_fingerprint: Option<String>,
    /// Admin header value. [`crate::credentials::DEFAULT_ADMIN_HEADER`] when absent.
    pub admin_header: Option<String>,
}

impl ClientConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the document is not valid JSON
    /// or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::ConfigurationError(format!("Invalid client config: {}", e)))
    }

    /// The per-dispatch timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            with_credentials: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            remember_me_token: None,
            browser_fingerprint: None,
            admin_header: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_all_fields() {
        let config = ClientConfig::from_json(
            r#"{
                "baseUrl": "http://localhost:8080/api",
                "withCredentials": false,
                "timeoutMs": 500,
                "rememberMeToken": "tok",
                "browserFingerprint": "fp",
                "adminHeader": "admin"
            }"#,
        )
        .unwrap();

        assert!(!config.with_credentials);
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.remember_me_token.as_deref(), Some("tok"));
        assert_eq!(config.browser_fingerprint.as_deref(), Some("fp"));
        assert_eq!(config.admin_header.as_deref(), Some("admin"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let result = ClientConfig::from_json(r#"{ "timeoutMs": "soon" }"#);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }
}
