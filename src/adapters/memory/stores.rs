//! Mutex-guarded TTL map implementing ReplayStore / RateStore / LockStore.

use crate::clock::Clock;
use crate::ports::error::StoreError;
use crate::ports::stores::{LockStore, RateStore, ReplayStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Entry {
    value: String,
    count: u64,
    /// Milliseconds since the Unix epoch
    expires_at: i64,
}

impl Entry {
    fn is_live(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

/// One map serves every store port; the key prefixes keep them apart.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn expiry(&self, ttl_secs: u64) -> i64 {
        self.clock.now_ms() + ttl_secs.max(1) as i64 * 1000
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let now = self.clock.now_ms();
        let expires_at = self.expiry(ttl_secs);
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return false;
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                count: 0,
                expires_at,
            },
        );
        true
    }
}

#[async_trait]
impl ReplayStore for MemoryStore {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now_ms();
        let entries = self.entries.lock().await;
        Ok(entries.get(key).is_some_and(|e| e.is_live(now)))
    }

    async fn register(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        Ok(self.set_if_absent(key, "1", ttl_secs).await)
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn increment(&self, key: &str, ttl_secs: u64) -> Result<u64, StoreError> {
        let now = self.clock.now_ms();
        let expires_at = self.expiry(ttl_secs);
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: String::new(),
            count: 0,
            expires_at,
        });
        if !entry.is_live(now) {
            entry.count = 0;
        }
        entry.count += 1;
        entry.expires_at = expires_at;
        Ok(entry.count)
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn acquire(&self, key: &str, holder: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        Ok(self.set_if_absent(key, holder, ttl_secs).await)
    }

    async fn release(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) && entry.value == holder => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn store() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_register_is_set_if_absent_until_expiry() {
        let (clock, store) = store();
        assert!(store.register("hmac:nonce:n1", 600).await.unwrap());
        assert!(!store.register("hmac:nonce:n1", 600).await.unwrap());
        assert!(store.contains("hmac:nonce:n1").await.unwrap());

        clock.advance(Duration::seconds(601));
        assert!(!store.contains("hmac:nonce:n1").await.unwrap());
        assert!(store.register("hmac:nonce:n1", 600).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_counts_and_resets_after_ttl() {
        let (clock, store) = store();
        for expected in 1..=3 {
            assert_eq!(store.increment("rl:ip:1", 60).await.unwrap(), expected);
        }
        clock.advance(Duration::seconds(61));
        assert_eq!(store.increment("rl:ip:1", 60).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lock_release_requires_holder() {
        let (_clock, store) = store();
        assert!(store.acquire("render:active:ip", "job_a", 900).await.unwrap());
        assert!(!store.acquire("render:active:ip", "job_b", 900).await.unwrap());

        assert!(!store.release("render:active:ip", "job_b").await.unwrap());
        assert!(store.release("render:active:ip", "job_a").await.unwrap());
        assert!(store.acquire("render:active:ip", "job_b", 900).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_expires_after_ttl() {
        let (clock, store) = store();
        assert!(store.acquire("render:active:ip", "job_a", 900).await.unwrap());
        clock.advance(Duration::seconds(900));
        assert!(store.acquire("render:active:ip", "job_b", 900).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (clock, store) = store();
        store.register("a", 10).await.unwrap();
        store.register("b", 100).await.unwrap();
        clock.advance(Duration::seconds(50));

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquire_has_one_winner() {
        let (_clock, store) = store();
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .acquire("render:active:ip", &format!("job_{}", i), 900)
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
