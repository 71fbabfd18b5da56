//! Fixed-window request counting per caller.

use crate::clock::Clock;
use crate::ports::stores::RateStore;
use std::sync::Arc;
use tracing::warn;

const KEY_PREFIX: &str = "rl:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub count: u64,
    /// Seconds until the current window closes
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    store: Arc<dyn RateStore>,
    fallback: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// `fallback` counts locally whenever `store` errors.
    pub fn new(
        store: Arc<dyn RateStore>,
        fallback: Arc<dyn RateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fallback,
            clock,
        }
    }

    pub async fn consume(&self, key: &str, limit: u64, window_secs: u64) -> RateDecision {
        let window_ms = window_secs.max(1) as i64 * 1000;
        let now = self.clock.now_ms();
        let window = now.div_euclid(window_ms);
        let bucket = format!("{}{}:{}", KEY_PREFIX, key, window);

        let count = match self.store.increment(&bucket, window_secs).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, key = %bucket, "Rate store unavailable, counting in-process");
                // An in-process store never fails; fail open if it somehow does.
                self.fallback
                    .increment(&bucket, window_secs)
                    .await
                    .unwrap_or(1)
            }
        };

        let window_end = (window + 1) * window_ms;
        let retry_after_secs = ((window_end - now) as u64).div_ceil(1000).max(1);
        RateDecision {
            allowed: count <= limit,
            count,
            retry_after_secs,
        }
    }
}
