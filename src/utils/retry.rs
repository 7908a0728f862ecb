//! Generic retry-with-backoff combinator (Design Notes §9: "composable
//! back-off on I/O"), parameterized by max attempts and initial delay,
//! doubling each time. Used by the Worker's analyzer call and available to
//! any other I/O-bound port.

use std::future::Future;
use std::time::Duration;

/// Retries `op` up to `max_attempts` times. The first failed attempt sleeps
/// `initial_delay`, the second `initial_delay * 2`, and so on. Returns the
/// last error if every attempt fails. `should_retry` lets the caller decide
/// whether a given error is worth retrying at all (e.g. a parse error is,
/// an auth error isn't).
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    max_attempts: u32,
    initial_delay: Duration,
    should_retry: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut delay = initial_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                tracing::warn!(attempt, ?delay, "retrying after failure: {err}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            },
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            |_: &String| true,
            || {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Ok(42) }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            |_: &String| true,
            || {
                let n = calls.fetch_add(1, Ordering::Relaxed);
                async move { if n < 2 { Err("not yet".to_string()) } else { Ok(7) } }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            |_: &String| true,
            || {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err("always fails".to_string()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn does_not_retry_when_should_retry_is_false() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            |_: &String| false,
            || {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err("terminal".to_string()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
