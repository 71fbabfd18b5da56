//! Store backend selection, resolved once at startup.

use super::memory::{MemoryJobRepository, MemoryStore};
use super::redis::RedisPool;
use crate::clock::Clock;
use crate::ports::repository::RenderJobRepository;
use crate::ports::stores::{LockStore, RateStore, ReplayStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Backends {
    /// `redis` or `memory`
    pub name: &'static str,
    pub replay: Arc<dyn ReplayStore>,
    pub rates: Arc<dyn RateStore>,
    /// Used per call when `rates` errors
    pub rate_fallback: Arc<dyn RateStore>,
    pub locks: Arc<dyn LockStore>,
    pub jobs: Arc<dyn RenderJobRepository>,
    /// In-process maps that need periodic sweeping
    sweepable: Vec<Arc<MemoryStore>>,
}

impl Backends {
    pub fn memory(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let fallback = Arc::new(MemoryStore::new(clock));
        Self {
            name: "memory",
            replay: store.clone(),
            rates: store.clone(),
            rate_fallback: fallback.clone(),
            locks: store.clone(),
            jobs: Arc::new(MemoryJobRepository::new()),
            sweepable: vec![store, fallback],
        }
    }

    pub fn redis(pool: RedisPool, clock: Arc<dyn Clock>) -> Self {
        let pool = Arc::new(pool);
        let fallback = Arc::new(MemoryStore::new(clock));
        Self {
            name: "redis",
            replay: pool.clone(),
            rates: pool.clone(),
            rate_fallback: fallback.clone(),
            locks: pool.clone(),
            jobs: pool,
            sweepable: vec![fallback],
        }
    }

    /// Redis when `redis_url` is set and answers PING, otherwise memory.
    pub async fn select(redis_url: Option<&str>, clock: Arc<dyn Clock>) -> Self {
        let Some(url) = redis_url else {
            info!("REDIS_URL not set, using in-process stores");
            return Self::memory(clock);
        };
        match RedisPool::connect(url).await {
            Ok(pool) => {
                info!("Connected to Redis");
                Self::redis(pool, clock)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, falling back to in-process stores");
                Self::memory(clock)
            }
        }
    }

    /// Periodically drop expired in-process entries.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let stores = self.sweepable.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                for store in &stores {
                    let removed = store.purge_expired().await;
                    if removed > 0 {
                        debug!(removed, "Swept expired entries");
                    }
                }
            }
        })
    }
}
