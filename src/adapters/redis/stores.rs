//! Redis ReplayStore / RateStore / LockStore implementations.

use super::pool::RedisPool;
use crate::ports::error::StoreError;
use crate::ports::stores::{LockStore, RateStore, ReplayStore};
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};

/// Delete the key only if it still holds the caller's value.
const RELEASE_IF_HELD: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

impl RedisPool {
    /// `SET key value NX EX ttl`; true when the key was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl ReplayStore for RedisPool {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn register(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        self.set_if_absent(key, "1", ttl_secs).await
    }
}

#[async_trait]
impl RateStore for RedisPool {
    async fn increment(&self, key: &str, ttl_secs: u64) -> Result<u64, StoreError> {
        let mut conn = self.pool.get().await?;
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .expire(key, ttl_secs.max(1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl LockStore for RedisPool {
    async fn acquire(&self, key: &str, holder: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        self.set_if_absent(key, holder, ttl_secs).await
    }

    async fn release(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let deleted: i64 = redis::Script::new(RELEASE_IF_HELD)
            .key(key)
            .arg(holder)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}
