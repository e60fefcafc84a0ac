//! HTTP retry helpers for transient errors.
//!
//! The feed is polled on a short interval, so retries are few and quick: a
//! request that keeps failing is better abandoned and picked up by the next
//! scheduled cycle than stretched across it.

use std::time::Duration;

use crate::FeedError;

/// Maximum number of retry attempts for transient HTTP errors
/// (connection failures, timeouts, 429 and 5xx responses).
///
/// With exponential backoff (1s, 2s) the total wait before giving up is
/// 3 seconds on top of the per-request timeouts.
pub const MAX_RETRIES: u32 = 2;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Does **not** retry HTTP 4xx (except 429); those are permanent.
///
/// # Errors
///
/// Returns [`FeedError`] if the request fails after all retries, the server
/// returns a non-retryable status, or the body cannot be read.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    Ok(response.text().await?)
}

/// Sends the request built by `build_request`, retrying transient failures
/// up to `max_retries` times with exponential backoff.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let can_retry = attempt < max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(FeedError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) {
                    if can_retry {
                        log::warn!("  HTTP {status}");
                        continue;
                    }
                    return Err(FeedError::Status { status });
                }

                if status.is_client_error() {
                    return Err(FeedError::Status { status });
                }

                return Ok(response);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): 1s, 2s, 4s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(6))
}

/// Returns `true` for 429 Too Many Requests and 5xx server errors.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::OK));
    }
}
