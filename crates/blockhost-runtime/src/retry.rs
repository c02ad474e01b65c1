//! Bounded retry with exponential backoff.
//!
//! Used by the network provisioner for the operations that fail transiently
//! in the field (IP-echo lookups, gateway requests). Attempt history is not
//! kept; each failure is logged and only the last error is returned.

use std::error::Error as StdError;
use std::fmt::Display;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry limits and delay progression.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `0` is treated as `1`.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after each failure.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let factor = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        Duration::try_from_secs_f64(current.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is exhausted.
///
/// Every error is considered retryable. Fails with the error of the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_backoff_if(policy, operation, |_| true).await
}

/// Like [`retry_with_backoff`], but stops at the first error for which
/// `is_retryable` returns `false` (e.g. HTTP 4xx).
pub async fn retry_with_backoff_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay.min(policy.max_delay);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable(&e) {
                    debug!(attempt, error = %e, "Non-retryable error, giving up");
                    return Err(e);
                }
                if attempt >= max_attempts {
                    warn!(attempts = attempt, error = %e, "Retries exhausted");
                    return Err(e);
                }

                debug!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
                delay = policy.next_delay(delay);
                attempt += 1;
            }
        }
    }
}

/// Error-message signatures of transient network failures.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection aborted",
    "timed out",
    "timeout",
    "econnrefused",
    "econnreset",
    "etimedout",
    "enotfound",
    "eai_again",
    "failed to lookup address",
    "name or service not known",
    "temporary failure in name resolution",
    "no such host",
    "dns error",
    "host unreachable",
    "no route to host",
    "network unreachable",
    "network is unreachable",
    "ehostunreach",
    "enetunreach",
];

/// Whether an error message looks like a transient network failure.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Classify an error (and its source chain) as a transient network failure.
///
/// HTTP client errors carrying a 4xx status are never transient; 5xx are.
pub fn is_transient_network_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);

    while let Some(e) = current {
        if let Some(http) = e.downcast_ref::<reqwest::Error>() {
            if let Some(status) = http.status() {
                return status.is_server_error();
            }
            if http.is_timeout() || http.is_connect() {
                return true;
            }
        }

        if let Some(io_err) = e.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::HostUnreachable
                    | io::ErrorKind::NetworkUnreachable
                    | io::ErrorKind::NotConnected
            )
        {
            return true;
        }

        if is_transient_message(&e.to_string()) {
            return true;
        }

        current = e.source();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_millis(1000))
            .with_backoff_multiplier(2.0)
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_operation_makes_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: Result<(), String> = retry_with_backoff(&policy(), || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {n}"))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "failure 3");

        // 1000ms after the first failure, 2000ms after the second, none after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn delays_grow_by_multiplier() {
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let start = Instant::now();

        let _: Result<(), &str> = retry_with_backoff(&policy(), || {
            let stamps = stamps.clone();
            async move {
                stamps.lock().unwrap().push(start.elapsed());
                Err("nope")
            }
        })
        .await;

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 3);
        assert_eq!(stamps[1] - stamps[0], Duration::from_millis(1000));
        assert_eq!(stamps[2] - stamps[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_fails_after_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), &str> = retry_with_backoff_if(
            &policy().with_max_attempts(10),
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("404 not found")
                }
            },
            |_| false,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), "404 not found");
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_once_operation_recovers() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<u32, String> = retry_with_backoff(&policy(), || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 { Err("connection reset".to_string()) } else { Ok(n) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_capped_at_max_delay() {
        let start = Instant::now();
        let policy = policy()
            .with_max_attempts(4)
            .with_backoff_multiplier(10.0)
            .with_max_delay(Duration::from_millis(2000));

        let _: Result<(), &str> = retry_with_backoff(&policy, || async { Err("down") }).await;

        // 1000 + 2000 + 2000
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(5100), "elapsed {elapsed:?}");
    }

    #[test]
    fn classifier_recognises_io_kinds() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::TimedOut,
            io::ErrorKind::HostUnreachable,
            io::ErrorKind::NetworkUnreachable,
        ] {
            let err = io::Error::from(kind);
            assert!(is_transient_network_error(&err), "{kind:?}");
        }
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(!is_transient_network_error(&err));
    }

    #[test]
    fn classifier_recognises_messages() {
        assert!(is_transient_message("getaddrinfo ENOTFOUND api.ipify.org"));
        assert!(is_transient_message("connect ECONNREFUSED 127.0.0.1:80"));
        assert!(is_transient_message("operation timed out"));
        assert!(is_transient_message("Network is unreachable (os error 101)"));
        assert!(!is_transient_message("HTTP 404 Not Found"));
        assert!(!is_transient_message("invalid certificate"));
    }

    #[test]
    fn classifier_walks_source_chain() {
        #[derive(Debug)]
        struct Wrapper(io::Error);
        impl std::fmt::Display for Wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("lookup failed")
            }
        }
        impl StdError for Wrapper {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Wrapper(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(is_transient_network_error(&err));
    }
}
