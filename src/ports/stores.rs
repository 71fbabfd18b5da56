//! Key-value stores backing replay protection, rate windows and locks.
//!
//! Every mutating operation must be atomic at the store: callers never
//! read-then-write to decide ownership of a key.

use super::error::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Whether the nonce key is currently held
    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Set-if-absent with TTL. Returns false when the key already existed.
    async fn register(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Increment the counter and (re)arm its TTL in one step.
    /// Returns the count after increment.
    async fn increment(&self, key: &str, ttl_secs: u64) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set-if-absent `key -> holder` with TTL. Returns false if already locked.
    async fn acquire(&self, key: &str, holder: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    /// Delete the lock only while it is still held by `holder`.
    async fn release(&self, key: &str, holder: &str) -> Result<bool, StoreError>;
}
