//! Bounded retry with exponential backoff for remote backends

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::{Error, Result};

/// Retry an operation with exponential backoff.
///
/// Runs at most `max_retries + 1` attempts, sleeping 1s, 2s, 4s, ...
/// between failures. The last error is returned once attempts are
/// exhausted. Timeouts surface as ordinary errors from the operation
/// and are retried like any other failure.
pub async fn retry_with_backoff<F, Fut, T>(max_retries: u32, label: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = Some(e);
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}",
                        label,
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| Error::config(format!("{label}: retried without an attempt"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(42) }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_then_fails() {
        tokio::time::pause();
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let fut = retry_with_backoff(2, "test", move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(Error::embedding("boom"))
            }
        });
        let result = fut.await;

        assert!(matches!(result, Err(Error::EmbeddingBackend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        tokio::time::pause();
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry_with_backoff(2, "test", move || {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(Error::generation("transient"))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 7);
    }
}
