//! # Restwell - an HTTP client façade for envelope-style JSON APIs
//!
//! Restwell wraps `reqwest` with the three things a session-bound web API
//! client keeps doing by hand:
//!
//! - **Session headers** - `remember-me-token`, `browser-fingerprint` and
//!   `admin-header` are written into every request. The token and fingerprint
//!   can be replaced at any time through the client.
//! - **Envelope normalization** - bodies of the form
//!   `{ "success": bool, "data": ..., "error": "..." }` become an
//!   [`Outcome`]: the data on success, an [`ApiError`] otherwise.
//! - **Retry on timeout** - a request carrying a [`RetryPolicy`] is re-issued
//!   after a transport timeout until its attempt budget is spent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restwell::{Client, RequestDescriptor, RetryPolicy};
//! use http::Method;
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Profile {
//!     nickname: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restwell::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(10))
//!         .build()?;
//!
//!     client.set_remember_me_token("token-from-login")?;
//!
//!     let descriptor = RequestDescriptor::new(Method::GET, "/profile")
//!         .with_retry(RetryPolicy::new(3).with_delay(Duration::from_millis(250)));
//!
//!     let response = client.call::<Profile>(descriptor).await?;
//!     match response.outcome {
//!         Ok(profile) => println!("Hello, {}", profile.nickname),
//!         Err(api_error) => println!("Server refused: {}", api_error),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Two failure channels
//!
//! Transport failures (timeouts after retries, refused connections, DNS
//! errors) are returned as `Err(`[`Error`]`)`. A response the server
//! completed is always `Ok`, even when the envelope reports failure; inspect
//! [`Response::outcome`] for that, or call [`Response::into_data`] to fold
//! both channels into one `Result`.

mod client;
pub mod config;
pub mod credentials;
mod error;
pub mod request;
pub mod response;
pub mod retry;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use request::RequestDescriptor;
pub use response::{ApiError, Outcome, Response};
pub use retry::{RetryDecision, RetryPolicy};
