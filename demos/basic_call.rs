//! Basic example: session headers, envelope outcomes and retry on timeout.
//!
//! Point it at a server speaking the `{ success, data, error }` envelope:
//!
//! Run with: `cargo run --example basic_call -- http://localhost:8080/api`

use http::Method;
use restwell::{Client, Error, RequestDescriptor, RetryPolicy};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restwell=debug,basic_call=info")
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080/api".to_string());

    let client = Client::builder()
        .base_url(&base_url)?
        .timeout(Duration::from_secs(2))
        .build()?;

    println!("Fingerprint: {}", client.credentials().browser_fingerprint());

    // After a login the server hands out a token; every later request carries it.
    client.set_remember_me_token("token-from-login")?;

    let descriptor = RequestDescriptor::new(Method::GET, "/status")
        .with_retry(RetryPolicy::new(3).with_delay(Duration::from_millis(500)));

    match client.call::<serde_json::Value>(descriptor).await {
        Ok(response) => {
            match &response.outcome {
                Ok(data) => println!("Data: {}", data),
                Err(api_error) => println!("Server reported failure: {}", api_error),
            }
            println!(
                "Status {} after {} attempt(s) in {:?}",
                response.status, response.attempts, response.latency
            );
        }
        Err(e) if e.is_timeout() => println!("Gave up, every attempt timed out: {}", e),
        Err(e) => println!("Transport failure: {}", e),
    }

    Ok(())
}
