//! Redis connection pool.

use crate::ports::error::StoreError;
use deadpool_redis::{redis, Config, Pool, Runtime};

/// Redis-backed adapter for store and repository operations.
#[derive(Clone)]
pub struct RedisPool {
    pub(super) pool: Pool,
}

impl RedisPool {
    /// Create a new RedisPool with connection pool.
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    /// Create the pool and prove the server answers.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let pool = Self::new(redis_url)?;
        pool.ping().await?;
        Ok(pool)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
