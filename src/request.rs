//! Request descriptors.

use crate::retry::RetryPolicy;
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;

/// Everything needed to dispatch one logical request.
///
/// A descriptor is owned by the call that dispatches it. The client writes the
/// session headers into it once, and every retry re-sends the same descriptor.
///
/// # Examples
///
/// ```
/// use restwell::{RequestDescriptor, RetryPolicy};
/// use http::Method;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), restwell::Error> {
/// let descriptor = RequestDescriptor::new(Method::POST, "/orders")
///     .with_header("x-request-source", "checkout")?
///     .with_query_param("dry_run", "true")
///     .with_json_body(&serde_json::json!({ "sku": "A-1" }))?
///     .with_retry(RetryPolicy::new(3).with_delay(Duration::from_millis(10)));
///
/// assert_eq!(descriptor.retry.unwrap().max_attempts, 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, resolved against the client's base URL.
    pub path: String,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// Query parameters, appended in insertion order.
    pub query_params: Vec<(String, String)>,

    /// JSON body, if any.
    pub body: Option<Value>,

    /// Retry-on-timeout policy. `None` disables retrying.
    pub retry: Option<RetryPolicy>,
}

impl RequestDescriptor {
    /// Creates a new `RequestDescriptor` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: None,
            retry: None,
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `body` cannot be represented as JSON.
    pub fn with_json_body<B>(mut self, body: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let value =
            serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Attaches a retry-on-timeout policy.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
