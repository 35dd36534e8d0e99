//! Bounded retry loop shared by the provider clients

use bridge_traits::RetryPolicy;
use std::future::Future;
use tokio::time::sleep;
use tracing::warn;

use crate::error::{MetadataError, Result};

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` attempts have been made.
///
/// The delay after a failed attempt follows the policy's backoff schedule,
/// except for rate-limit responses carrying `Retry-After`, whose delay is used
/// instead (still capped at `max_delay`).
pub async fn with_retry<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = match &e {
                    MetadataError::RateLimited {
                        retry_after: Some(retry_after),
                        ..
                    } => (*retry_after).min(policy.max_delay),
                    _ => policy.delay_for(attempt),
                };
                warn!(
                    provider,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Provider request failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
