//! Token-bucket rate limiting, one instance per external provider (spec §4.1, §5).
//!
//! The bucket is shared across all callers of a provider and uses a mutex
//! only for the constant-time token-count update, never held across a
//! suspension point (spec §5 shared-resource policy).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use litgraph_common::config::RateLimitConfig;

use crate::error::ProviderError;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket capped at `capacity`, refilling at `refill_per_sec`.
pub struct TokenBucket {
    cfg: RateLimitConfig,
    state: Mutex<Bucket>,
}

impl TokenBucket {
    pub fn new(cfg: RateLimitConfig) -> Self {
        let capacity = cfg.capacity as f64;
        Self {
            cfg,
            state: Mutex::new(Bucket { tokens: capacity, last_refill: Instant::now() }),
        }
    }

    fn try_take_one(&self) -> bool {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        let refilled = (state.tokens + elapsed * self.cfg.refill_per_sec).min(self.cfg.capacity as f64);
        state.tokens = refilled;
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait for a token, polling at a short interval, up to `acquire_timeout_ms`.
    /// Suspends at every poll (spec §5 suspension points) rather than busy-spinning.
    pub async fn acquire(&self) -> Result<(), ProviderError> {
        let deadline = Instant::now() + Duration::from_millis(self.cfg.acquire_timeout_ms);
        loop {
            if self.try_take_one() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProviderError::RateLimited { retry_after_ms: None });
            }
            let poll_interval = Duration::from_millis(((1000.0 / self.cfg.refill_per_sec.max(1.0)) as u64).clamp(5, 200));
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_succeeds_within_capacity() {
        let bucket = TokenBucket::new(RateLimitConfig { capacity: 2, refill_per_sec: 1.0, acquire_timeout_ms: 100 });
        assert!(bucket.acquire().await.is_ok());
        assert!(bucket.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn acquire_times_out_when_exhausted() {
        let bucket = TokenBucket::new(RateLimitConfig { capacity: 1, refill_per_sec: 0.001, acquire_timeout_ms: 20 });
        assert!(bucket.acquire().await.is_ok());
        let result = bucket.acquire().await;
        assert_eq!(result, Err(ProviderError::RateLimited { retry_after_ms: None }));
    }

    #[tokio::test]
    async fn refill_eventually_allows_more_tokens() {
        let bucket = TokenBucket::new(RateLimitConfig { capacity: 1, refill_per_sec: 50.0, acquire_timeout_ms: 200 });
        assert!(bucket.acquire().await.is_ok());
        // Should refill well within the 200ms timeout at 50/sec.
        assert!(bucket.acquire().await.is_ok());
    }
}
