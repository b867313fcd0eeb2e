//! Exponential backoff with jitter, honoring provider retry-after hints and
//! cooperative cancellation (spec §4.1 retry policy, §5 cancellation).

use std::future::Future;
use std::time::Duration;

use litgraph_common::config::RetryConfig;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Observes a retry attempt, tagged by provider name and error kind — the
/// observability counter spec §4.1 requires (e.g. `RateLimited=5` in
/// `status().errors_by_kind` after a run of internally-retried requests
/// that eventually succeeded).
pub trait RetryObserver: Send + Sync {
    fn record_retry(&self, provider: &str, kind: &str);
}

/// Discards every retry. The default when nothing downstream is counting.
#[derive(Debug, Default)]
pub struct NoopRetryObserver;

impl RetryObserver for NoopRetryObserver {
    fn record_retry(&self, _provider: &str, _kind: &str) {}
}

/// Run `op` with retry/backoff. Non-retryable errors surface immediately.
/// Each retry increments `on_retry` (the observability counter from spec §4.1).
pub async fn retry_with_backoff<T, F, Fut>(
    cfg: &RetryConfig,
    cancel: &CancellationToken,
    provider: &str,
    mut op: F,
    mut on_retry: impl FnMut(&str, &str),
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let result = op().await;
        match result {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                attempt += 1;
                if attempt >= cfg.max_attempts {
                    warn!(provider, attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(err);
                }

                on_retry(provider, err.kind_tag());

                let retry_after = match &err {
                    ProviderError::RateLimited { retry_after_ms: Some(ms) } => Some(Duration::from_millis(*ms)),
                    _ => None,
                };
                let delay = retry_after.unwrap_or_else(|| backoff_delay(cfg, attempt));
                debug!(provider, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after backoff");

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                }
            }
        }
    }
}

fn backoff_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
    let raw = cfg.base_delay_ms as f64 * cfg.backoff_factor.powi(attempt as i32 - 1);
    let capped = raw.min(cfg.max_delay_ms as f64);
    let jitter_span = capped * cfg.jitter_ratio;
    let jittered = if jitter_span > 0.0 {
        let mut rng = rand::thread_rng();
        capped + rng.gen_range(-jitter_span..=jitter_span)
    } else {
        capped
    };
    Duration::from_millis(jittered.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let cfg = RetryConfig { max_attempts: 3, base_delay_ms: 1, backoff_factor: 2.0, max_delay_ms: 10, jitter_ratio: 0.0 };
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = retry_with_backoff(&cfg, &cancel, "test", move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(42)
            }
        }, |_, _| {}).await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let cfg = RetryConfig { max_attempts: 5, base_delay_ms: 1, backoff_factor: 1.0, max_delay_ms: 5, jitter_ratio: 0.0 };
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let retries = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let retries2 = retries.clone();
        let result = retry_with_backoff(&cfg, &cancel, "test", move || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(ProviderError::Unavailable) } else { Ok(n) }
            }
        }, move |_, _| { retries2.fetch_add(1, Ordering::SeqCst); }).await;
        assert_eq!(result, Ok(2));
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_surfaces_immediately() {
        let cfg = RetryConfig::default();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = retry_with_backoff(&cfg, &cancel, "test", move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ProviderError::NotFound)
            }
        }, |_, _| {}).await;
        assert_eq!(result, Err(ProviderError::NotFound));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_abandons_retries() {
        let cfg = RetryConfig { max_attempts: 10, base_delay_ms: 50, backoff_factor: 1.0, max_delay_ms: 50, jitter_ratio: 0.0 };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = retry_with_backoff(&cfg, &cancel, "test", || async { Err::<i32, _>(ProviderError::Unavailable) }, |_, _| {}).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
    }
}
