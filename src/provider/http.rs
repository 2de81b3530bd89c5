//! # Provider HTTP
//!
//! Shared HTTP plumbing for providers: client construction with timeouts, and
//! request execution with bounded retry on transport failures.

use crate::controller::backoff::RetryPolicy;
use crate::observability::metrics;
use crate::provider::ProviderError;
use reqwest::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Build an HTTP client with request and connect timeouts
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialised
pub fn build_client(timeout: Duration, connect_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(concat!("mailerlite-operator/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Whether a send error is worth retrying
fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Execute a request, retrying transport failures according to `policy`
///
/// `build` is called once per attempt because request bodies (multipart in
/// particular) cannot always be cloned. Any HTTP response, whatever its status,
/// is returned to the caller without retrying.
pub async fn execute_with_retry<F>(
    provider: &'static str,
    operation: &'static str,
    policy: RetryPolicy,
    build: F,
) -> Result<Response, ProviderError>
where
    F: Fn() -> RequestBuilder,
{
    let mut retry = 0;
    loop {
        let start = Instant::now();
        match build().send().await {
            Ok(response) => {
                metrics::observe_provider_request(provider, operation, start.elapsed());
                debug!(
                    provider,
                    operation,
                    status = %response.status(),
                    "provider.response"
                );
                return Ok(response);
            }
            Err(e) if retry < policy.max_retries && is_retryable(&e) => {
                let delay = policy.delay_for(retry);
                retry += 1;
                warn!(
                    provider,
                    operation,
                    attempt = retry,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Provider request failed, retrying"
                );
                metrics::increment_provider_retries(provider, operation);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                metrics::observe_provider_request(provider, operation, start.elapsed());
                return Err(ProviderError::Transport {
                    provider,
                    source: e,
                });
            }
        }
    }
}

/// Read a response body, mapping read failures to transport errors
pub async fn read_body(provider: &'static str, response: Response) -> Result<Vec<u8>, ProviderError> {
    response
        .bytes()
        .await
        .map(|body| body.to_vec())
        .map_err(|source| ProviderError::Transport { provider, source })
}
