//! Retrying full-item downloads.

use super::Priority;
use crate::config::{FetchPolicy, PrefetchConfig};
use crate::error::{FetchError, FetchFailure};
use crate::item::RemoteAddress;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_async::time::{sleep, timeout};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A complete item body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBlob {
    pub body: Bytes,
    pub content_type: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Downloads whole items, retrying per [`FetchPolicy`].
///
/// The HTTP client must not retry on its own; the attempt count seen by the
/// network is exactly what the policy allows.
pub struct RetryingFetcher {
    http: Arc<dyn HttpClient>,
    high: FetchPolicy,
    low: FetchPolicy,
    fallback_content_type: String,
}

impl RetryingFetcher {
    pub fn new(http: Arc<dyn HttpClient>, config: &PrefetchConfig) -> Self {
        Self {
            http,
            high: config.high,
            low: config.low,
            fallback_content_type: config.fallback_content_type.clone(),
        }
    }

    pub fn policy(&self, priority: Priority) -> &FetchPolicy {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }

    /// Fetches `address` in full.
    ///
    /// Retries transport failures, timeouts and non-success statuses with
    /// exponential backoff. A 404 ends the sequence immediately.
    #[instrument(skip(self, address), fields(url = %redact_if_sensitive("url", address.as_str()), %priority))]
    pub async fn fetch(
        &self,
        address: &RemoteAddress,
        priority: Priority,
    ) -> Result<FetchedBlob, FetchFailure> {
        let policy = *self.policy(priority);
        let max_attempts = policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.attempt(address, &policy).await {
                Ok(response) => {
                    let content_type = response
                        .content_type()
                        .unwrap_or(&self.fallback_content_type)
                        .to_string();
                    debug!(attempt, size = response.body.len(), "Fetched full item");
                    return Ok(FetchedBlob {
                        body: response.body,
                        content_type,
                        attempts: attempt,
                    });
                }
                Err(error) if !error.is_retryable() || attempt >= max_attempts => {
                    warn!(attempt, error = %error, "Fetch failed");
                    return Err(FetchFailure {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                Err(error) => {
                    let delay = policy.backoff_delay(attempt - 1);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Fetch attempt failed, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        address: &RemoteAddress,
        policy: &FetchPolicy,
    ) -> Result<HttpResponse, FetchError> {
        let request = HttpRequest::get(address.as_str()).timeout(policy.attempt_timeout);
        let response = match timeout(policy.attempt_timeout, self.http.execute(request)).await {
            Err(_) | Ok(Err(BridgeError::Timeout)) => {
                return Err(FetchError::Timeout(policy.attempt_timeout))
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(response)) => response,
        };

        if response.is_not_found() {
            return Err(FetchError::NotFound {
                url: address.to_string(),
            });
        }
        if response.is_partial() && !covers_whole_resource(&response) {
            return Err(FetchError::HttpStatus {
                status: response.status,
                url: address.to_string(),
            });
        }
        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
                url: address.to_string(),
            });
        }
        Ok(response)
    }
}

/// A 206 is only usable as a cache entry if it carries every byte.
fn covers_whole_resource(response: &HttpResponse) -> bool {
    match response.content_range() {
        Some(range) => {
            let len = response.body.len() as u64;
            range.start == 0
                && range.end.checked_add(1).map_or(false, |end| range.total == Some(end))
                && range.byte_len() == Some(len)
        }
        None => false,
    }
}
