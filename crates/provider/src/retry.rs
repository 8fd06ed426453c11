//! Status classification and the bounded retry loop.
//!
//! [`classify_status`] is a pure mapping from an HTTP status to a
//! [`RetryDecision`]; [`with_retry`] drives any fallible async operation
//! under a [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use souschef_core::generation::{MAX_PROVIDER_ATTEMPTS, PROVIDER_RETRY_BACKOFF};

use crate::error::ProviderError;

/// What to do after a non-success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Fail now; retrying cannot help (bad credential).
    NoRetry,
    /// Wait, then try again.
    RetryAfter(Duration),
    /// Not a recognised failure class; fail now and surface the cause.
    Unhandled,
}

/// Map an HTTP status code to a retry decision.
pub fn classify_status(status: u16) -> RetryDecision {
    match status {
        401 => RetryDecision::NoRetry,
        429 | 500..=599 => RetryDecision::RetryAfter(PROVIDER_RETRY_BACKOFF),
        _ => RetryDecision::Unhandled,
    }
}

/// Turn a failed response into the matching [`ProviderError`].
pub fn error_for_status(status: u16, body: String) -> ProviderError {
    match classify_status(status) {
        RetryDecision::NoRetry => ProviderError::Authorization { body },
        RetryDecision::RetryAfter(retry_after) => ProviderError::Transient {
            status,
            body,
            retry_after,
        },
        RetryDecision::Unhandled => {
            ProviderError::Unhandled(format!("unexpected status {status}: {body}"))
        }
    }
}

/// Limits for [`with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first one included.
    pub max_attempts: u32,
    /// Fixed wait between attempts. `None` uses the delay chosen by
    /// [`classify_status`].
    pub backoff: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_PROVIDER_ATTEMPTS,
            backoff: None,
        }
    }
}

impl RetryPolicy {
    /// Policy with no wait between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Some(Duration::ZERO),
        }
    }
}

/// Run `op` until it succeeds, fails non-transiently, or the attempt cap is
/// reached.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(retry_after) = err.retry_after() else {
            return Err(err);
        };

        if attempt >= max_attempts {
            tracing::warn!(attempt, error = %err, "Provider retries exhausted");
            return Err(ProviderError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = policy.backoff.unwrap_or(retry_after);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient provider failure, retrying",
        );
        tokio::time::sleep(delay).await;
    }
}
