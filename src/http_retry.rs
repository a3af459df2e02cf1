//! Origin GET with retry and backoff.
//!
//! Used for whole-document fetches (the source M3U, origin HLS playlists)
//! where one transient failure should not fail startup or a client request.
//! Segment downloads deliberately do not go through here: a failed segment
//! is skipped and the batch moves on.

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::warn;

/// Default number of fetch attempts (1 initial + 1 retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default backoff between attempts in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (0 is treated as 1).
    pub max_attempts: u32,
    /// Sleep duration between consecutive attempts.
    pub backoff: Duration,
    /// Optional per-attempt timeout. `None` leaves the client's own timeout.
    pub timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            timeout: None,
        }
    }
}

/// GET `url`, retrying network errors and non-2xx responses.
///
/// Returns the first successful response, or the error of the last attempt.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    config: &RetryConfig,
) -> Result<Response, reqwest::Error> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let mut request = client.get(url);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let result = request
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(response) => return Ok(response),
            Err(e) if attempt >= max_attempts => {
                warn!(
                    "Fetch of {} failed after {} attempt(s): {}",
                    url, max_attempts, e
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Fetch of {} failed (attempt {}/{}), retrying in {}ms: {}",
                    url,
                    attempt,
                    max_attempts,
                    config.backoff.as_millis(),
                    e
                );
            }
        }

        tokio::time::sleep(config.backoff).await;
        attempt += 1;
    }
}
