//! Error types for transport and configuration failures.
//!
//! Only failures that never produced a usable response travel through [`Error`].
//! A response the server answered with `success: false` is not an error here; it
//! is returned as a value (see [`crate::response::Outcome`]).

use crate::response::ApiError;
use http::StatusCode;

/// The main error type for HTTP calls made through [`crate::Client`].
///
/// # Examples
///
/// ```no_run
/// use restwell::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.get::<serde_json::Value>("/status").await {
///     Ok(response) => match response.outcome {
///         Ok(data) => println!("Data: {:?}", data),
///         Err(api_error) => eprintln!("Server said no: {}", api_error),
///     },
///     Err(e) if e.is_timeout() => eprintln!("Gave up after timeouts: {}", e),
///     Err(e) => eprintln!("Transport failure: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request did not complete within the configured timeout.
    ///
    /// This is the only failure class the client retries. When retries are
    /// exhausted the last timeout is returned as-is.
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// A network-level error occurred (connection refused, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The envelope's `data` payload could not be deserialized into the expected type.
    ///
    /// # Fields
    ///
    /// * `raw_response` - The raw response body as a string
    /// * `serde_error` - The error message from serde
    /// * `status` - The HTTP status code of the response
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided.
    ///
    /// Covers invalid header names or values, a missing base URL and
    /// failures while building the underlying HTTP client.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server answered, but reported failure in its envelope.
    ///
    /// The client never returns this variant on its own. It is only produced by
    /// [`crate::Response::into_data`], which folds the application failure into
    /// the error channel for callers that prefer a single `Result`.
    #[error("Application error: {0}")]
    Application(ApiError),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err)
        } else {
            Error::Network(err)
        }
    }
}

impl Error {
    /// Returns `true` if this is a transport timeout.
    ///
    /// Callers use this to tell retry exhaustion apart from other transport failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Application(api_error) => Some(api_error.status),
            Error::Network(err) | Error::Timeout(err) => err.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for HTTP calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
