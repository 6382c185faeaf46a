//! Response envelope normalization.
//!
//! Servers answer with a JSON envelope of the form
//! `{ "success": bool, "data": any, "error": string }`. [`normalize`] turns a
//! completed response into an [`Outcome`]: the `data` payload when the server
//! reported success, or an [`ApiError`] otherwise. Application failures are
//! returned as values, never through the crate's [`Error`] channel.

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// The body contract consumed from the server.
///
/// Fields are kept loosely typed so that a body with unexpected field types
/// is still classified instead of being rejected outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Success flag. Only the literal `true` counts as success.
    #[serde(default)]
    pub success: Option<Value>,
    /// Payload returned to the caller on success.
    #[serde(default)]
    pub data: Option<Value>,
    /// Human-readable failure message.
    #[serde(default)]
    pub error: Option<Value>,
}

impl Envelope {
    /// Parses a response body. Anything other than a JSON object is not an envelope.
    pub fn parse(raw_body: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw_body).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Returns `true` only when `success` is the boolean `true`.
    pub fn is_success(&self) -> bool {
        matches!(self.success, Some(Value::Bool(true)))
    }

    /// Returns `true` when `success` is missing, `null`, `false`, `0` or `""`.
    pub fn is_failure(&self) -> bool {
        match &self.success {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => !b,
            Some(Value::Number(n)) => n.as_f64() == Some(0.0),
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => false,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// An application-level failure reported by the server.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    /// The envelope's `error` message, or the status text when there was none.
    pub message: String,
    /// The HTTP status code of the response that carried the failure.
    pub status: StatusCode,
}

impl ApiError {
    /// Creates a new `ApiError`.
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

/// The normalized result of a completed response.
pub type Outcome<T> = std::result::Result<T, ApiError>;

/// Returns the reason phrase for `status`, or its numeric code when it has none.
pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// Classifies a completed response.
///
/// 1. A 2xx status whose envelope says `success: true` yields the `data` payload.
/// 2. An envelope whose `success` is falsy yields an [`ApiError`] with the
///    envelope's `error` message.
/// 3. Anything else yields an [`ApiError`] with the status text.
///
/// # Errors
///
/// Returns [`Error::DeserializationFailed`] if the `data` payload does not
/// match `T`. That is a contract violation, not an application failure.
///
/// # Examples
///
/// ```
/// use restwell::response::normalize;
/// use http::StatusCode;
///
/// let ok = normalize::<u32>(StatusCode::OK, r#"{"success":true,"data":7}"#).unwrap();
/// assert_eq!(ok, Ok(7));
///
/// let failed = normalize::<u32>(StatusCode::OK, r#"{"success":false,"error":"E"}"#).unwrap();
/// assert_eq!(failed.unwrap_err().message, "E");
/// ```
pub fn normalize<T>(status: StatusCode, raw_body: &str) -> Result<Outcome<T>>
where
    T: DeserializeOwned,
{
    let envelope = Envelope::parse(raw_body);

    match envelope {
        Some(envelope) if status.is_success() && envelope.is_success() => {
            let data = envelope.data.unwrap_or(Value::Null);
            match serde_json::from_value::<T>(data) {
                Ok(data) => Ok(Ok(data)),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        raw_response = %raw_body,
                        "Failed to deserialize envelope data"
                    );

                    Err(Error::DeserializationFailed {
                        raw_response: raw_body.to_string(),
                        serde_error: e.to_string(),
                        status,
                    })
                }
            }
        }
        Some(envelope) if envelope.is_failure() => {
            let message = envelope
                .error_message()
                .unwrap_or_else(|| status_text(status));
            Ok(Err(ApiError::new(message, status)))
        }
        _ => Ok(Err(ApiError::new(status_text(status), status))),
    }
}

/// A completed HTTP exchange.
///
/// `outcome` holds either the envelope's data or the application failure the
/// server reported. The surrounding fields describe the transport exchange.
///
/// # Examples
///
/// ```no_run
/// use restwell::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), restwell::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = client.get::<User>("/users/123").await?;
///
/// match &response.outcome {
///     Ok(user) => println!("User: {}", user.name),
///     Err(api_error) => println!("Rejected ({}): {}", api_error.status, api_error),
/// }
/// println!("Request took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The normalized outcome.
    pub outcome: Outcome<T>,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The total latency of the logical request, including every retry.
    pub latency: Duration,

    /// The number of dispatches made, `1` when the first one completed.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        outcome: Outcome<T>,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            outcome,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Returns `true` if the server reported success.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns the data payload, if the server reported success.
    pub fn data(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// Returns the application failure, if the server reported one.
    pub fn error(&self) -> Option<&ApiError> {
        self.outcome.as_ref().err()
    }

    /// Folds the application failure into [`Error::Application`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use restwell::{Response, response::ApiError};
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response: Response<u32> = Response::new(
    ///     Err(ApiError::new("quota exceeded", StatusCode::OK)),
    ///     String::new(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(5),
    ///     1,
    /// );
    ///
    /// let err = response.into_data().unwrap_err();
    /// assert_eq!(err.to_string(), "Application error: quota exceeded");
    /// ```
    pub fn into_data(self) -> Result<T> {
        self.outcome.map_err(Error::Application)
    }

    /// Maps the data payload, preserving the failure and the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            outcome: self.outcome.map(f),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request needed more than one dispatch.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a response header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
    }

    #[test]
    fn test_success_returns_data() {
        let outcome =
            normalize::<User>(StatusCode::OK, r#"{"success":true,"data":{"id":4}}"#).unwrap();
        assert_eq!(outcome, Ok(User { id: 4 }));
    }

    #[test]
    fn test_success_without_data_deserializes_null() {
        let outcome = normalize::<Option<User>>(StatusCode::CREATED, r#"{"success":true}"#).unwrap();
        assert_eq!(outcome, Ok(None));
    }

    #[test]
    fn test_success_false_returns_error_message() {
        let outcome =
            normalize::<User>(StatusCode::OK, r#"{"success":false,"error":"E"}"#).unwrap();
        let err = outcome.unwrap_err();
        assert_eq!(err.message, "E");
        assert_eq!(err.status, StatusCode::OK);
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        let outcome = normalize::<User>(StatusCode::OK, r#"{"error":"no flag"}"#).unwrap();
        assert_eq!(outcome.unwrap_err().message, "no flag");
    }

    #[test]
    fn test_failure_without_message_uses_status_text() {
        let outcome =
            normalize::<User>(StatusCode::BAD_REQUEST, r#"{"success":false}"#).unwrap();
        assert_eq!(outcome.unwrap_err().message, "Bad Request");
    }

    #[test]
    fn test_non_2xx_success_envelope_uses_status_text() {
        let outcome = normalize::<User>(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success":true,"data":{"id":1}}"#,
        )
        .unwrap();
        assert_eq!(outcome.unwrap_err().message, "Internal Server Error");
    }

    #[test]
    fn test_unusable_body_uses_status_text() {
        for body in ["", "not json", "[1,2]", "\"text\""] {
            let outcome = normalize::<User>(StatusCode::BAD_GATEWAY, body).unwrap();
            assert_eq!(outcome.unwrap_err().message, "Bad Gateway");
        }
    }

    #[test]
    fn test_truthy_non_boolean_flag_is_neither() {
        let outcome = normalize::<User>(
            StatusCode::OK,
            r#"{"success":"yes","data":{"id":1},"error":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(outcome.unwrap_err().message, "OK");
    }

    #[test]
    fn test_mismatched_data_is_deserialization_error() {
        let result = normalize::<User>(StatusCode::OK, r#"{"success":true,"data":"oops"}"#);
        match result {
            Err(Error::DeserializationFailed { status, .. }) => assert_eq!(status, StatusCode::OK),
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_status_text_for_unknown_code() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(status_text(status), "599");
    }
}
