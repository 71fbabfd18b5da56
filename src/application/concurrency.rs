//! Per-caller exclusive lock around long-running work.

use crate::error::{ApiError, ApiResult, LimitReason};
use crate::ports::stores::LockStore;
use std::sync::Arc;
use tracing::warn;

pub const RENDER_LOCK_PREFIX: &str = "render:active:";
pub const INGEST_LOCK_PREFIX: &str = "ingest:active:";

pub struct ConcurrencyGuard {
    store: Arc<dyn LockStore>,
    prefix: &'static str,
    reason: LimitReason,
    ttl_secs: u64,
}

impl ConcurrencyGuard {
    pub fn new(
        store: Arc<dyn LockStore>,
        prefix: &'static str,
        reason: LimitReason,
        ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            prefix,
            reason,
            ttl_secs,
        }
    }

    /// Guard for render jobs, one outstanding job per caller.
    pub fn render(store: Arc<dyn LockStore>, ttl_secs: u64) -> Self {
        Self::new(
            store,
            RENDER_LOCK_PREFIX,
            LimitReason::RenderConcurrency,
            ttl_secs,
        )
    }

    /// Guard for ingest calls.
    pub fn ingest(store: Arc<dyn LockStore>, ttl_secs: u64) -> Self {
        Self::new(store, INGEST_LOCK_PREFIX, LimitReason::Concurrency, ttl_secs)
    }

    fn key(&self, caller: &str) -> String {
        format!("{}{}", self.prefix, caller)
    }

    pub async fn try_acquire(&self, caller: &str, job_id: &str) -> ApiResult<bool> {
        Ok(self
            .store
            .acquire(&self.key(caller), job_id, self.ttl_secs)
            .await?)
    }

    /// Like [`Self::try_acquire`] but maps a held lock to a 429.
    pub async fn acquire(&self, caller: &str, job_id: &str) -> ApiResult<()> {
        if self.try_acquire(caller, job_id).await? {
            Ok(())
        } else {
            Err(ApiError::limited(self.reason))
        }
    }

    /// Release only if `job_id` still holds the caller's lock. Errors are
    /// logged; the TTL reclaims the lock eventually.
    pub async fn release(&self, caller: &str, job_id: &str) -> bool {
        match self.store.release(&self.key(caller), job_id).await {
            Ok(released) => released,
            Err(e) => {
                warn!(caller = %caller, job_id = %job_id, error = %e, "Failed to release lock");
                false
            }
        }
    }
}
