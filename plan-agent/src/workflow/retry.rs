//! Transient-failure retry with exponential backoff
//!
//! Transient failures are classified by substring match on the rendered
//! error chain, the same patterns the external services put in their error
//! bodies: HTTP 429, rate limiting, timeouts, temporary unavailability.
//! Anything else is non-retriable.

use anyhow::Result;
use plan_agent_sdk::log_task_retry;
use std::future::Future;
use std::time::Duration;

/// Backoff policy: `max_attempts` total attempts, `base_delay` before the
/// first retry, doubling per attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

/// Whether an error looks like a passing condition worth retrying
pub fn is_transient(err: &anyhow::Error) -> bool {
    let msg = format!("{:#}", err).to_lowercase();
    msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("timeout")
        || msg.contains("temporarily unavailable")
}

/// Run `op` until it succeeds, retrying transient failures with exponential
/// backoff. Non-transient failures and the final attempt's failure propagate
/// immediately, tagged with the attempt count.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts || !is_transient(&err) {
                    return Err(err.context(format!("failed after {} attempt(s)", attempt)));
                }
                let delay = policy.base_delay * (1u32 << (attempt - 1));
                log_task_retry!(attempt, delay.as_millis() as u64, format!("{:#}", err));
                eprintln!(
                    "[workflow] retry in {} ms due to: {:#}",
                    delay.as_millis(),
                    err
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
