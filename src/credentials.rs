//! Session headers injected into every outgoing request.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use rand::Rng;

/// Header carrying the remember-me token.
pub const REMEMBER_ME_TOKEN: HeaderName = HeaderName::from_static("remember-me-token");

/// Header carrying the browser fingerprint.
pub const BROWSER_FINGERPRINT: HeaderName = HeaderName::from_static("browser-fingerprint");

/// Header carrying the static admin-access value.
pub const ADMIN_HEADER: HeaderName = HeaderName::from_static("admin-header");

/// Admin header value used when none is configured.
pub const DEFAULT_ADMIN_HEADER: &str = "restwell-admin";

/// Current values of the three injected headers.
///
/// A client holds one `Credentials` behind a lock. Each logical request takes
/// a snapshot when it is decorated, so later updates never reach a request
/// that is already in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    remember_me_token: HeaderValue,
    browser_fingerprint: HeaderValue,
    admin_header: HeaderValue,
}

impl Credentials {
    /// Creates credentials with an empty token, a random fingerprint and the
    /// default admin header.
    pub fn new() -> Self {
        Self {
            remember_me_token: HeaderValue::from_static(""),
            browser_fingerprint: random_fingerprint(),
            admin_header: HeaderValue::from_static(DEFAULT_ADMIN_HEADER),
        }
    }

    /// Replaces the remember-me token. An empty token is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if `token` is not a valid header value.
    pub fn set_remember_me_token(&mut self, token: impl AsRef<str>) -> Result<()> {
        self.remember_me_token = header_value(&REMEMBER_ME_TOKEN, token.as_ref())?;
        Ok(())
    }

    /// Replaces the browser fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if `fingerprint` is empty or not a
    /// valid header value.
    pub fn set_browser_fingerprint(&mut self, fingerprint: impl AsRef<str>) -> Result<()> {
        self.browser_fingerprint = non_empty_value(&BROWSER_FINGERPRINT, fingerprint.as_ref())?;
        Ok(())
    }

    /// Replaces the admin header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if `value` is empty or not a valid
    /// header value.
    pub fn set_admin_header(&mut self, value: impl AsRef<str>) -> Result<()> {
        self.admin_header = non_empty_value(&ADMIN_HEADER, value.as_ref())?;
        Ok(())
    }

    /// The current remember-me token.
    pub fn remember_me_token(&self) -> &str {
        self.remember_me_token.to_str().unwrap_or_default()
    }

    /// The current browser fingerprint.
    pub fn browser_fingerprint(&self) -> &str {
        self.browser_fingerprint.to_str().unwrap_or_default()
    }

    /// The current admin header value.
    pub fn admin_header(&self) -> &str {
        self.admin_header.to_str().unwrap_or_default()
    }

    /// Writes the three headers into `headers`, replacing any existing values.
    pub fn decorate(&self, headers: &mut HeaderMap) {
        headers.insert(REMEMBER_ME_TOKEN, self.remember_me_token.clone());
        headers.insert(BROWSER_FINGERPRINT, self.browser_fingerprint.clone());
        headers.insert(ADMIN_HEADER, self.admin_header.clone());
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new()
    }
}

/// Only visible ASCII, space and tab are accepted, so the accessors can
/// always read the value back.
fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue> {
    if let Some(c) = value
        .chars()
        .find(|&c| c != '\t' && !(' '..='~').contains(&c))
    {
        return Err(Error::ConfigurationError(format!(
            "Invalid value for {}: unsupported character {:?}",
            name, c
        )));
    }

    HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid value for {}: {}", name, e)))
}

fn non_empty_value(name: &HeaderName, value: &str) -> Result<HeaderValue> {
    if value.is_empty() {
        return Err(Error::ConfigurationError(format!("{} must not be empty", name)));
    }
    header_value(name, value)
}

fn random_fingerprint() -> HeaderValue {
    let bits: u128 = rand::thread_rng().gen();
    // Hex digits are always a valid header value.
    HeaderValue::try_from(format!("{:032x}", bits))
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_sets_all_headers() {
        let mut credentials = Credentials::new();
        credentials.set_remember_me_token("tok").unwrap();
        credentials.set_browser_fingerprint("fp").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(REMEMBER_ME_TOKEN, HeaderValue::from_static("caller"));
        credentials.decorate(&mut headers);

        assert_eq!(headers.get("remember-me-token").unwrap(), "tok");
        assert_eq!(headers.get("browser-fingerprint").unwrap(), "fp");
        assert_eq!(headers.get("admin-header").unwrap(), DEFAULT_ADMIN_HEADER);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_default_fingerprint_is_random_hex() {
        let a = Credentials::new();
        let b = Credentials::new();

        assert_eq!(a.browser_fingerprint().len(), 32);
        assert!(a.browser_fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.browser_fingerprint(), b.browser_fingerprint());
    }

    #[test]
    fn test_empty_fingerprint_rejected() {
        let mut credentials = Credentials::new();
        let before = credentials.browser_fingerprint().to_string();

        assert!(matches!(
            credentials.set_browser_fingerprint(""),
            Err(Error::ConfigurationError(_))
        ));
        assert_eq!(credentials.browser_fingerprint(), before);
    }

    #[test]
    fn test_non_ascii_token_rejected() {
        let mut credentials = Credentials::new();
        credentials.set_remember_me_token("before").unwrap();

        assert!(matches!(
            credentials.set_remember_me_token("jeton-été"),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            credentials.set_admin_header("clé"),
            Err(Error::ConfigurationError(_))
        ));
        assert_eq!(credentials.remember_me_token(), "before");
    }

    #[test]
    fn test_accessors_round_trip() {
        let mut credentials = Credentials::new();
        credentials.set_remember_me_token("a.b-c_d~e f").unwrap();
        credentials.set_admin_header("x;y=z").unwrap();

        assert_eq!(credentials.remember_me_token(), "a.b-c_d~e f");
        assert_eq!(credentials.admin_header(), "x;y=z");
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut credentials = Credentials::new();
        assert!(matches!(
            credentials.set_remember_me_token("line\nbreak"),
            Err(Error::ConfigurationError(_))
        ));
        assert_eq!(credentials.remember_me_token(), "");
    }
}
