//! Retry with exponential back-off and jitter for provider HTTP calls.
//!
//! Only idempotent reads go through [`retry_with_backoff`]. Transient failures
//! (rate limiting, server overload, connection resets, timeouts) are retried;
//! business errors from the provider are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::DiscoveryError;

/// Upper bound on a single back-off sleep.
const MAX_DELAY_MS: u64 = 30_000;

/// Retry policy shared by every provider adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay: the n-th retry waits `backoff_base_ms * 2^(n-1)` ± 25 %.
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`DiscoveryError::RateLimited`]: HTTP 429 or a provider quota status.
/// - [`DiscoveryError::Http`]: timeout or connect failure.
/// - [`DiscoveryError::UnexpectedStatus`] with a 5xx code.
///
/// **Not retriable:** provider API errors, unparsable bodies, 4xx statuses,
/// and everything raised before a request is sent.
pub(crate) fn is_retriable(err: &DiscoveryError) -> bool {
    match err {
        DiscoveryError::RateLimited { .. } => true,
        DiscoveryError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        DiscoveryError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Sleep before retry number `attempt` (1-based). `jitter` is in `[0, 1)` and
/// maps to a ±25 % spread. A rate-limit error waits at least its
/// `retry_after_secs`. The result never exceeds [`MAX_DELAY_MS`].
fn backoff_delay_ms(policy: RetryPolicy, attempt: u32, err: &DiscoveryError, jitter: f64) -> u64 {
    let computed = policy
        .backoff_base_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (jitter * 0.5 + 0.75)) as u64;
    let floor = match err {
        DiscoveryError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    jittered.max(floor).min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt |
/// |---------|---------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter |
/// | 2       | 500 ms × 2¹ ± 25 % jitter |
/// | 3       | 500 ms × 2² ± 25 % jitter |
///
/// A rate-limit error waits at least as long as the provider asked. Delay is
/// capped at 30 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, DiscoveryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DiscoveryError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(policy, attempt, &err, rand::random::<f64>());
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient provider error; retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
