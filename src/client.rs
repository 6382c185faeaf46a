//! HTTP client façade.
//!
//! The [`Client`] runs every logical request through the same pipeline:
//! session headers are written into the descriptor, the descriptor is
//! dispatched (and re-dispatched after a timeout while its retry policy
//! allows), and the completed response is normalized into an
//! [`crate::response::Outcome`].

use crate::{
    config::ClientConfig,
    credentials::Credentials,
    request::RequestDescriptor,
    response::{normalize, Response},
    retry::{RetryDecision, RetryPolicy},
    Error, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// An HTTP client that injects session headers, normalizes response envelopes
/// and retries timed-out requests.
///
/// The client is cheap to clone; clones share the connection pool and the
/// session credentials.
///
/// # Examples
///
/// ```no_run
/// use restwell::{Client, RequestDescriptor, RetryPolicy};
/// use http::Method;
/// use serde::Deserialize;
/// use std::time::Duration;
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
///     .timeout(Duration::from_secs(5))
///     .build()?;
///
/// client.set_remember_me_token("session-token")?;
///
/// let descriptor = RequestDescriptor::new(Method::GET, "/users/123")
///     .with_retry(RetryPolicy::new(3).with_delay(Duration::from_millis(200)));
///
/// let response = client.call::<User>(descriptor).await?;
/// match response.outcome {
///     Ok(user) => println!("User: {}", user.name),
///     Err(api_error) => println!("Server refused: {}", api_error),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    credentials: RwLock<Credentials>,
    default_retry: Option<RetryPolicy>,
}

/// A dispatch that produced a complete response.
struct Completed {
    status: StatusCode,
    headers: HeaderMap,
    raw_body: String,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Builds a client from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config)?.build()
    }

    /// Replaces the remember-me token sent by every request decorated from now on.
    ///
    /// Requests already in flight, including their retries, keep the token
    /// they were decorated with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if `token` is not a valid header value.
    pub fn set_remember_me_token(&self, token: impl AsRef<str>) -> Result<()> {
        self.inner.credentials.write().set_remember_me_token(token)?;
        tracing::debug!("Remember-me token updated");
        Ok(())
    }

    /// Replaces the browser fingerprint sent by every request decorated from now on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if `fingerprint` is empty or not a
    /// valid header value.
    pub fn set_browser_fingerprint(&self, fingerprint: impl AsRef<str>) -> Result<()> {
        self.inner
            .credentials
            .write()
            .set_browser_fingerprint(fingerprint)?;
        tracing::debug!("Browser fingerprint updated");
        Ok(())
    }

    /// Returns a snapshot of the current session credentials.
    pub fn credentials(&self) -> Credentials {
        self.inner.credentials.read().clone()
    }

    /// Dispatches a request and normalizes its response.
    ///
    /// The outer `Result` carries transport failures; a timeout is only
    /// returned once the descriptor's retry policy is spent. A response the
    /// server completed is always `Ok`, with the application outcome in
    /// [`Response::outcome`].
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] - every allowed dispatch timed out
    /// * [`Error::Network`] - any other transport failure, never retried
    /// * [`Error::DeserializationFailed`] - the envelope's `data` did not match `Res`
    pub async fn call<Res>(&self, mut descriptor: RequestDescriptor) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let url = self.resolve_url(&descriptor)?;
        self.decorate(&mut descriptor);

        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.dispatch(&descriptor, &url, attempt).await {
                Ok(completed) => {
                    let latency = start_time.elapsed();
                    return self.finish(completed, latency, attempt);
                }
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %descriptor.method,
                path = %descriptor.path,
                "Request failed"
            );

            match RetryDecision::decide(descriptor.retry.as_ref(), &error, attempt) {
                RetryDecision::Retry(delay) => {
                    tracing::info!(
                        delay_ms = delay.as_millis(),
                        attempt = attempt,
                        "Retrying timed out request after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => return Err(error),
            }
        }
    }

    /// Merges default headers and the session credentials into the descriptor.
    fn decorate(&self, descriptor: &mut RequestDescriptor) {
        let mut headers = self.inner.default_headers.clone();
        headers.extend(std::mem::take(&mut descriptor.headers));
        self.inner.credentials.read().decorate(&mut headers);
        descriptor.headers = headers;
    }

    fn resolve_url(&self, descriptor: &RequestDescriptor) -> Result<Url> {
        // Always relative, so a segment like `files:upload` is not read as a scheme.
        let relative = format!("./{}", descriptor.path.trim_start_matches('/'));
        let mut url = self.inner.base_url.join(&relative)?;

        if !descriptor.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &descriptor.query_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Executes a single dispatch, reading the whole body.
    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        url: &Url,
        attempt: usize,
    ) -> Result<Completed> {
        tracing::debug!(
            method = %descriptor.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(descriptor.method.clone(), url.clone())
            .headers(descriptor.headers.clone());

        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let raw_body = response.text().await?;

        Ok(Completed {
            status,
            headers,
            raw_body,
        })
    }

    fn finish<Res>(
        &self,
        completed: Completed,
        latency: Duration,
        attempts: usize,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let Completed {
            status,
            headers,
            raw_body,
        } = completed;

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        let outcome = normalize::<Res>(status, &raw_body)?;
        if let Err(api_error) = &outcome {
            tracing::debug!(
                status = status.as_u16(),
                message = %api_error,
                "Server reported failure"
            );
        }

        Ok(Response::new(
            outcome, raw_body, status, headers, latency, attempts,
        ))
    }

    fn descriptor(&self, method: Method, path: impl Into<String>) -> RequestDescriptor {
        let mut descriptor = RequestDescriptor::new(method, path);
        descriptor.retry = self.inner.default_retry.clone();
        descriptor
    }

    /// Makes a GET request to the specified path.
    ///
    /// Uses the client's default retry policy, if one was configured.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restwell::Client;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct User { name: String }
    ///
    /// # async fn example() -> Result<(), restwell::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let user = client.get::<User>("/users/123").await?.into_data()?;
    /// println!("User: {}", user.name);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(self.descriptor(Method::GET, path)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let descriptor = self.descriptor(Method::POST, path).with_json_body(body)?;
        self.call(descriptor).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let descriptor = self.descriptor(Method::PUT, path).with_json_body(body)?;
        self.call(descriptor).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(self.descriptor(Method::DELETE, path)).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let descriptor = self.descriptor(Method::PATCH, path).with_json_body(body)?;
        self.call(descriptor).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use restwell::{ClientBuilder, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), restwell::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com/v1")?
///     .timeout(Duration::from_secs(30))
///     .with_credentials(false)
///     .browser_fingerprint("3f9a0c")?
///     .default_header("User-Agent", "my-app/1.0")?
///     .default_retry(RetryPolicy::new(3).with_delay(Duration::from_millis(100)))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    credentials: Credentials,
    default_retry: Option<RetryPolicy>,
    timeout: Duration,
    with_credentials: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    ///
    /// Defaults: a 10 second timeout, cookies kept, no retries, an empty
    /// remember-me token and a random browser fingerprint.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            credentials: Credentials::new(),
            default_retry: None,
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            with_credentials: true,
        }
    }

    /// Creates a builder pre-populated from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or one of the credential values is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::ConfigurationError("Base URL is required".to_string()));
        }

        let mut builder = Self::new()
            .base_url(&config.base_url)?
            .timeout(config.timeout())
            .with_credentials(config.with_credentials);

        if let Some(token) = &config.remember_me_token {
            builder = builder.remember_me_token(token)?;
        }
        if let Some(fingerprint) = &config.browser_fingerprint {
            builder = builder.browser_fingerprint(fingerprint)?;
        }
        if let Some(admin_header) = &config.admin_header {
            builder = builder.admin_header(admin_header)?;
        }

        Ok(builder)
    }

    /// Sets the base URL request paths are resolved against.
    ///
    /// The base path is kept: with a base of `https://host/api`, the path
    /// `/users` resolves to `https://host/api/users`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot carry a path.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Base URL cannot carry a path: {}",
                url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// Request-specific headers and the session headers take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the initial remember-me token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value.
    pub fn remember_me_token(mut self, token: impl AsRef<str>) -> Result<Self> {
        self.credentials.set_remember_me_token(token)?;
        Ok(self)
    }

    /// Sets the initial browser fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the fingerprint is empty or not a valid header value.
    pub fn browser_fingerprint(mut self, fingerprint: impl AsRef<str>) -> Result<Self> {
        self.credentials.set_browser_fingerprint(fingerprint)?;
        Ok(self)
    }

    /// Sets the admin header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty or not a valid header value.
    pub fn admin_header(mut self, value: impl AsRef<str>) -> Result<Self> {
        self.credentials.set_admin_header(value)?;
        Ok(self)
    }

    /// Sets the retry policy used by [`Client::get`], [`Client::post`] and the
    /// other verb helpers.
    ///
    /// Descriptors passed to [`Client::call`] keep their own policy.
    pub fn default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = Some(policy);
        self
    }

    /// Sets the per-dispatch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keeps a cookie store and replays server-set cookies when `true`.
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the client
    /// configuration is invalid.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .cookie_store(self.with_credentials)
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                credentials: RwLock::new(self.credentials),
                default_retry: self.default_retry,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::builder().base_url(base).unwrap().build().unwrap()
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = client("http://localhost:8080/api");
        let descriptor = RequestDescriptor::new(Method::GET, "/users/1");

        let url = client.resolve_url(&descriptor).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/users/1");
    }

    #[test]
    fn test_colon_in_first_segment_stays_relative() {
        let client = client("http://localhost:8080/api");
        let descriptor = RequestDescriptor::new(Method::POST, "/files:upload");

        let url = client.resolve_url(&descriptor).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/files:upload");
    }

    #[test]
    fn test_empty_path_resolves_to_base() {
        let client = client("http://localhost:8080/api");
        let descriptor = RequestDescriptor::new(Method::GET, "");

        let url = client.resolve_url(&descriptor).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn test_config_without_base_url() {
        let result = Client::from_config(&ClientConfig::default());
        match result {
            Err(Error::ConfigurationError(msg)) => assert_eq!(msg, "Base URL is required"),
            Err(e) => panic!("Expected ConfigurationError, got {:?}", e),
            Ok(_) => panic!("Expected ConfigurationError, got a client"),
        }
    }

    #[test]
    fn test_query_params_appended() {
        let client = client("http://localhost:8080");
        let descriptor = RequestDescriptor::new(Method::GET, "search")
            .with_query_param("q", "rust lang")
            .with_query_param("page", "2");

        let url = client.resolve_url(&descriptor).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/search?q=rust+lang&page=2");
    }

    #[test]
    fn test_missing_base_url() {
        let result = Client::builder().build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_decorate_overrides_caller_session_headers() {
        let client = Client::builder()
            .base_url("http://localhost")
            .unwrap()
            .default_header("x-app", "demo")
            .unwrap()
            .remember_me_token("tok")
            .unwrap()
            .build()
            .unwrap();

        let mut descriptor = RequestDescriptor::new(Method::GET, "/")
            .with_header("remember-me-token", "caller")
            .unwrap()
            .with_header("x-app", "override")
            .unwrap();
        client.decorate(&mut descriptor);

        assert_eq!(descriptor.headers.get("remember-me-token").unwrap(), "tok");
        assert_eq!(descriptor.headers.get("x-app").unwrap(), "override");
        assert!(!descriptor
            .headers
            .get("browser-fingerprint")
            .unwrap()
            .is_empty());
        assert!(!descriptor.headers.get("admin-header").unwrap().is_empty());
    }

    #[test]
    fn test_setters_update_snapshot() {
        let client = client("http://localhost");
        client.set_remember_me_token("new-token").unwrap();
        client.set_browser_fingerprint("fp-1").unwrap();

        let credentials = client.credentials();
        assert_eq!(credentials.remember_me_token(), "new-token");
        assert_eq!(credentials.browser_fingerprint(), "fp-1");
    }

    #[test]
    fn test_verb_helpers_use_default_retry() {
        let client = Client::builder()
            .base_url("http://localhost")
            .unwrap()
            .default_retry(RetryPolicy::new(4))
            .build()
            .unwrap();

        let descriptor = client.descriptor(Method::GET, "/");
        assert_eq!(descriptor.retry, Some(RetryPolicy::new(4)));
    }
}
