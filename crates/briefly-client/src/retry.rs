use std::time::Duration;

use tracing::warn;

use crate::errors::{TransportError, TransportErrorKind, UserFacingError};

/// Exponential backoff policy for the non-streaming request path.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub initial_backoff: Duration,
    /// Exponential multiplier per further attempt.
    pub backoff_factor: f64,
    /// Upper bound for computed backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1_000),
            backoff_factor: 2.0,
            max_backoff: Duration::from_millis(5_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff slept before attempt `n` (1-based): zero for the first
    /// attempt, then `initial * factor^(n-2)` clamped to `max_backoff`.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = self.backoff_factor.powi(attempt as i32 - 2);
        let millis = (self.initial_backoff.as_millis() as f64 * exp).round() as u64;
        Duration::from_millis(millis.min(self.max_backoff.as_millis() as u64))
    }
}

/// Network reachability probe consulted before each retry attempt.
///
/// Platforms with a connectivity API can implement this; the default probe
/// assumes the network is up and lets the attempt itself find out.
pub trait Reachability: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Probe used when no platform-specific connectivity check is available.
pub struct AlwaysReachable;

impl Reachability for AlwaysReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}

/// DNS and connection-refused failures are non-transient; retrying them
/// only delays the inevitable.
fn is_fail_fast(kind: TransportErrorKind) -> bool {
    matches!(
        kind,
        TransportErrorKind::Dns | TransportErrorKind::ConnectRefused
    )
}

/// Runs `op` up to `policy.max_attempts` times with exponential backoff.
///
/// Attempts are strictly sequential. Before each attempt after the first the
/// reachability probe is consulted; an unreachable network fails immediately
/// without consuming the attempt. On exhaustion the returned error is
/// categorized from the last observed failure.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    reachability: &dyn Reachability,
    mut op: F,
) -> Result<T, UserFacingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if is_fail_fast(err.kind) || attempt >= policy.max_attempts {
                    return Err(UserFacingError::from_transport(&err));
                }
                warn!(attempt, error = %err, "summarize request failed; retrying");
                if !reachability.is_reachable() {
                    return Err(UserFacingError::no_network());
                }
                tokio::time::sleep(policy.backoff_before(attempt + 1)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    struct Unreachable;

    impl Reachability for Unreachable {
        fn is_reachable(&self) -> bool {
            false
        }
    }

    #[test]
    fn backoff_schedule_is_one_then_two_seconds_capped_at_five() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_before(1), Duration::ZERO);
        assert_eq!(policy.backoff_before(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_before(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_before(4), Duration::from_millis(4_000));
        assert_eq!(policy.backoff_before(5), Duration::from_millis(5_000));
        assert_eq!(policy.backoff_before(9), Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn three_timeouts_sleep_one_then_two_seconds() {
        let calls = Arc::new(AtomicU32::new(0));
        let op_calls = calls.clone();
        let started = Instant::now();

        let result: Result<(), _> = run_with_retry(&RetryPolicy::default(), &AlwaysReachable, || {
            let calls = op_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::timeout("deadline elapsed"))
            }
        })
        .await;

        let err = result.expect_err("should exhaust attempts");
        assert_eq!(err.category, ErrorCategory::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms before attempt 2 plus 2000ms before attempt 3.
        assert_eq!(started.elapsed(), Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_refused_fails_fast_with_one_attempt_and_no_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let op_calls = calls.clone();
        let started = Instant::now();

        let result: Result<(), _> = run_with_retry(&RetryPolicy::default(), &AlwaysReachable, || {
            let calls = op_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::connect_refused("connection refused"))
            }
        })
        .await;

        let err = result.expect_err("should fail fast");
        assert_eq!(err.category, ErrorCategory::Unreachable);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn dns_failure_fails_fast() {
        let result: Result<(), _> =
            run_with_retry(&RetryPolicy::default(), &AlwaysReachable, || async {
                Err(TransportError::dns("failed to look up host"))
            })
            .await;
        assert_eq!(
            result.expect_err("fail fast").category,
            ErrorCategory::Unreachable
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_network_short_circuits_without_consuming_an_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let op_calls = calls.clone();

        let result: Result<(), _> = run_with_retry(&RetryPolicy::default(), &Unreachable, || {
            let calls = op_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::timeout("deadline elapsed"))
            }
        })
        .await;

        let err = result.expect_err("no network");
        assert_eq!(err.category, ErrorCategory::NoNetwork);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_transient_failure_stops_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let op_calls = calls.clone();

        let result = run_with_retry(&RetryPolicy::default(), &AlwaysReachable, || {
            let calls = op_calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TransportError::timeout("deadline elapsed"))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_the_last_failure_not_the_first() {
        let calls = Arc::new(AtomicU32::new(0));
        let op_calls = calls.clone();

        let result: Result<(), _> = run_with_retry(&RetryPolicy::default(), &AlwaysReachable, || {
            let calls = op_calls.clone();
            async move {
                // Two resets, then a timeout on the final attempt.
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TransportError::new(TransportErrorKind::Reset, "reset"))
                } else {
                    Err(TransportError::timeout("deadline elapsed"))
                }
            }
        })
        .await;

        assert_eq!(
            result.expect_err("exhausted").category,
            ErrorCategory::Timeout
        );
    }
}
